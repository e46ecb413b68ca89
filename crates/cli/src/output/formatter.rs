//! Line-oriented response writer
//!
//! Ensures consistent output formatting across all commands. A failed write
//! does not interrupt the command that caused it; the first failure is kept
//! and surfaced to the read loop, which treats it as fatal.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Writer for shell responses
pub struct Formatter {
    writer: Box<dyn Write + Send + Sync>,
    failure: Option<io::Error>,
}

impl Formatter {
    pub fn new(writer: Box<dyn Write + Send + Sync>) -> Self {
        Self {
            writer,
            failure: None,
        }
    }

    /// Formatter bound to the process stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            self.failure.get_or_insert(e);
        }
    }

    /// Print one line of text
    pub fn println(&mut self, message: &str) {
        let result = writeln!(self.writer, "{message}");
        self.record(result);
    }

    /// Print an error line
    pub fn error(&mut self, message: &str) {
        let result = writeln!(self.writer, "Error: {message}");
        self.record(result);
    }

    /// Output a value as pretty JSON
    pub fn json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => self.println(&json),
            Err(e) => self.error(&format!("could not serialize output: {e}")),
        }
    }

    /// Write bytes as-is, followed by a newline unless they end with one
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let mut result = self.writer.write_all(bytes);
        if result.is_ok() && !bytes.ends_with(b"\n") {
            result = self.writer.write_all(b"\n");
        }
        self.record(result);
    }

    /// Write the prompt without a newline and flush it
    pub fn prompt(&mut self, text: &str) {
        let result = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush());
        self.record(result);
    }

    pub fn flush(&mut self) {
        let result = self.writer.flush();
        self.record(result);
    }

    /// First write failure since the last call, if any
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.failure.take()
    }
}

/// In-memory writer whose contents stay readable after being handed to a [`Formatter`]
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Discard everything written so far
    pub fn clear(&self) {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lines_and_errors() {
        let capture = Capture::new();
        let mut out = Formatter::new(Box::new(capture.clone()));
        out.println("1 item(s)");
        out.error("unknown command");
        out.prompt("sh3> ");
        assert_eq!(capture.contents(), "1 item(s)\nError: unknown command\nsh3> ");
    }

    #[test]
    fn test_write_raw_terminates_line() {
        let capture = Capture::new();
        let mut out = Formatter::new(Box::new(capture.clone()));
        out.write_raw(b"hello");
        out.write_raw(b"world\n");
        assert_eq!(capture.contents(), "hello\nworld\n");
    }

    #[test]
    fn test_json_output() {
        let capture = Capture::new();
        let mut out = Formatter::new(Box::new(capture.clone()));
        out.json(&serde_json::json!({"Content-Length": "5"}));
        assert!(capture.contents().contains("\"Content-Length\": \"5\""));
    }

    #[test]
    fn test_first_failure_is_kept() {
        let mut out = Formatter::new(Box::new(Broken));
        out.println("a");
        out.println("b");
        let err = out.take_error().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(out.take_error().is_none());
    }
}
