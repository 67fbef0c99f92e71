//! An in-process transport used by this crate's own tests (and by downstream tests behind the
//! `test-support` feature) to drive a [`crate::session::Session`] without a real browser.

use tokio::sync::mpsc;

/// Creates a connected pair: `(our reader, our writer, their reader, their writer)`, so a test
/// can sit on one end and play the browser while a `Session` runs on the other.
pub fn channel() -> (MockReader, MockWriter, MockReader, MockWriter) {
    let (to_a, from_b) = mpsc::unbounded_channel();
    let (to_b, from_a) = mpsc::unbounded_channel();
    (MockReader { rx: from_a }, MockWriter { tx: to_a }, MockReader { rx: from_b }, MockWriter { tx: to_b })
}

pub struct MockReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockReader {
    pub async fn read_frame(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }
}

pub struct MockWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl MockWriter {
    pub async fn write_frame(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock peer dropped"))
    }
}
