use crate::error::Error;

/// Batches rendered lines into packets of at most `capacity` bytes.
///
/// Lines inside a packet are separated by a single `\n` with no trailing
/// newline. A line that would overflow the buffer flushes the buffered
/// packet first, so packets never exceed the capacity. The one exception
/// is a single line larger than the capacity itself, which is sent alone
/// and reported as an error.
pub(crate) struct PacketBuilder {
    buf: Vec<u8>,
    capacity: usize,
}

impl PacketBuilder {
    pub fn new(capacity: usize) -> PacketBuilder {
        PacketBuilder {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends one line, handing completed packets to `send`.
    pub fn push(&mut self, line: &[u8], send: &mut dyn FnMut(&[u8])) -> Result<(), Error> {
        if line.is_empty() {
            return Ok(());
        }
        if line.len() > self.capacity {
            self.flush(send);
            send(line);
            return Err(Error::OversizedLine {
                size: line.len(),
                limit: self.capacity,
            });
        }
        // One byte for the separator when the buffer already holds lines.
        let needed = line.len() + usize::from(!self.buf.is_empty());
        if self.buf.len() + needed > self.capacity {
            self.flush(send);
        }
        if !self.buf.is_empty() {
            self.buf.push(b'\n');
        }
        self.buf.extend_from_slice(line);
        Ok(())
    }

    /// Sends the buffered packet, if any.
    pub fn flush(&mut self, send: &mut dyn FnMut(&[u8])) {
        if self.buf.is_empty() {
            return;
        }
        send(&self.buf);
        self.buf.clear();
    }
}
