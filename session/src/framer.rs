//! Byte-level framing of the pipe stream: messages are JSON objects separated by a single NUL
//! (`0x00`) byte, never embedded in a well-formed UTF-8 JSON payload. See the component design
//! for the decoding rules this implements.

/// Incremental NUL-delimited frame decoder.
///
/// Feed it bytes as they arrive over the pipe; it yields zero or more complete frames per call,
/// buffering any trailing partial frame across calls.
#[derive(Debug, Default)]
pub struct Framer {
    buf: Vec<u8>,
}

impl Framer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends newly read bytes and drains every complete (NUL-terminated) frame out of the
    /// buffer, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(i) = self.buf.iter().position(|&b| b == 0u8) {
            let frame = self.buf.drain(..=i).collect::<Vec<u8>>();
            frames.push(frame[..frame.len() - 1].to_vec());
        }
        frames
    }

    /// Called once the stream has reached EOF. If a non-terminated tail remains buffered, it is
    /// returned as a final, best-effort frame; an empty buffer signals a clean end of sequence.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Encodes one payload for the wire: the bytes verbatim followed by the `0x00` delimiter.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.push(0u8);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_message() {
        let mut framer = Framer::new();
        let encoded = encode(b"hello");
        let frames = framer.feed(&encoded);
        assert_eq!(frames, vec![b"hello".to_vec()]);
    }

    #[test]
    fn round_trips_a_sequence_under_arbitrary_chunking() {
        let messages: Vec<&[u8]> = vec![b"{}", b"{\"a\":1}", b"third"];
        let mut stream = Vec::new();
        for m in &messages {
            stream.extend(encode(m));
        }

        for chunk_size in 1..=stream.len() {
            let mut framer = Framer::new();
            let mut collected = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                collected.extend(framer.feed(chunk));
            }
            assert_eq!(collected, messages.iter().map(|m| m.to_vec()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn eof_with_empty_buffer_signals_end() {
        let mut framer = Framer::new();
        framer.feed(&encode(b"complete"));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn eof_with_trailing_bytes_yields_final_frame() {
        let mut framer = Framer::new();
        let _ = framer.feed(b"no delimiter here");
        assert_eq!(framer.finish(), Some(b"no delimiter here".to_vec()));
    }

    #[test]
    fn nul_never_appears_inside_a_yielded_frame() {
        let mut framer = Framer::new();
        let frames = framer.feed(&encode(b"{}"));
        for frame in frames {
            assert!(!frame.contains(&0u8));
        }
    }
}
