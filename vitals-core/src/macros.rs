/// Logs an internal diagnostic message.
///
/// The first argument is the `debug` flag of the client options in scope.
/// With the `debug-logs` feature the message is routed through the
/// [`log`] crate under the `vitals` target and the flag only suppresses
/// the stderr fallback; without it the message goes to stderr when the
/// flag is set.
#[cfg(feature = "debug-logs")]
#[macro_export]
macro_rules! vitals_debug {
    ($debug:expr, $($arg:tt)*) => {{
        let _ = &$debug;
        $crate::__log::debug!(target: "vitals", $($arg)*);
    }};
}

/// Logs an internal diagnostic message if debug output is enabled.
#[cfg(not(feature = "debug-logs"))]
#[macro_export]
macro_rules! vitals_debug {
    ($debug:expr, $($arg:tt)*) => {{
        if $debug {
            eprint!("[vitals] ");
            eprintln!($($arg)*);
        }
    }};
}
