use std::sync::Arc;

use vitals::test::{with_captured_lines, with_captured_lines_options, TestTransport};
use vitals::{Client, ClientOptions, MetricSink, Tags};

#[test]
fn test_every_kind_renders_its_marker() {
    let lines = with_captured_lines(|client| {
        let tags = Tags::new();
        client.count("requests", 2, &tags);
        client.increment("hits", &tags);
        client.decrement("pool.free", &tags);
        client.gauge("queue.depth", 7, &tags);
        client.gauge_float("load", 0.25, &tags);
        client.histogram("batch.size", 9, &tags);
        client.histogram_float("ratio", 1.5, &tags);
        client.time("render", 183, &tags);
        client.set("users", "user-1", &tags);
    });
    assert_eq!(
        lines,
        vec![
            "requests:2|c",
            "hits:1|c",
            "pool.free:-1|c",
            "queue.depth:7|g",
            "load:0.25|g",
            "batch.size:9|h",
            "ratio:1.5|h",
            "render:183|ms",
            "users:user-1|s",
        ]
    );
}

#[test]
fn test_prefix_and_constant_tags() {
    let lines = with_captured_lines_options(
        |client| {
            client.count("requests", 1, &Tags::of("path", "/login"));
        },
        ClientOptions {
            prefix: "app".into(),
            constant_tags: Tags::of("host", "web-1"),
            ..Default::default()
        },
    );
    assert_eq!(lines, vec!["app.requests:1|c|#host:web-1,path:/login"]);
}

#[test]
fn test_trailing_prefix_dot_is_not_doubled() {
    let lines = with_captured_lines_options(
        |client| client.increment("requests", &Tags::new()),
        ClientOptions {
            prefix: "app.".into(),
            ..Default::default()
        },
    );
    assert_eq!(lines, vec!["app.requests:1|c"]);
}

#[test]
fn test_tag_sanitization_reaches_the_wire() {
    let lines = with_captured_lines(|client| {
        client.increment("requests", &Tags::of("pa:th", "lo#gin "));
    });
    assert_eq!(lines, vec!["requests:1|c|#pa_th:lo_gin"]);
}

#[test]
fn test_float_values_drop_insignificant_zeros() {
    let lines = with_captured_lines(|client| {
        let tags = Tags::new();
        client.gauge_float("a", 1.0, &tags);
        client.gauge_float("b", 0.000_000_1, &tags);
        client.gauge_float("c", 2.5, &tags);
    });
    assert_eq!(lines, vec!["a:1|g", "b:0|g", "c:2.5|g"]);
}

#[test]
fn test_float_values_survive_the_wire_within_a_micro() {
    for value in [0.123_456_789, 98_765.432_1, 0.000_001, 7.25] {
        let lines = with_captured_lines(|client| {
            client.gauge_float("v", value, &Tags::new());
        });
        let rendered = lines[0]
            .strip_prefix("v:")
            .and_then(|rest| rest.strip_suffix("|g"))
            .unwrap();
        let parsed: f64 = rendered.parse().unwrap();
        assert!(
            (parsed - value).abs() < 1e-6,
            "{value} rendered as {rendered}"
        );
    }
}

#[test]
fn test_flush_drains_the_queue() {
    let transport = TestTransport::new();
    let client = Client::with_options(ClientOptions {
        transport: Some(Arc::new(transport.clone())),
        ..Default::default()
    });

    client.count("a", 1, &Tags::new());
    assert!(client.flush(None));
    assert_eq!(transport.fetch_and_clear_lines(), vec!["a:1|c"]);

    client.close(None);
    // A closed client drops further measurements on the floor.
    client.count("b", 1, &Tags::new());
    assert!(client.flush(None));
    assert!(transport.fetch_and_clear_lines().is_empty());
}

#[test]
fn test_missing_transport_disables_the_client() {
    let client = Client::with_options(ClientOptions::default());
    assert!(!client.is_enabled());
    // Measurements are swallowed and flushing trivially succeeds.
    client.count("a", 1, &Tags::new());
    assert!(client.flush(None));
}
