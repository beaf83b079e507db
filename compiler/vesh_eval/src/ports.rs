//! Where a frame reads input from and writes output to.
//!
//! Every command has two output streams: a stream of values (`put`) and a
//! stream of bytes (`echo`, external commands). Pipeline stages pass values
//! to each other over channels; byte output always goes to the frame's byte
//! sink.
//!
//! Sinks use enum dispatch: there are exactly two of each, and the hot path
//! (`put` in a loop) should not pay for a vtable.

use std::io::Write;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::value::Value;

/// Destination of value output.
#[derive(Clone, Debug)]
pub enum ValueSink {
    /// Print each value as `▶ repr`.
    Stdout,
    /// Feed the next pipeline stage, or an output capture.
    Channel(Sender<Value>),
}

/// Destination of byte output.
#[derive(Clone, Debug)]
pub enum ByteSink {
    Stdout,
    /// Collect into memory, for output capture and tests.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

#[derive(Clone, Debug)]
pub struct Ports {
    /// Values produced by the previous pipeline stage, if any.
    pub input: Option<Receiver<Value>>,
    pub values: ValueSink,
    pub bytes: ByteSink,
}

impl Default for Ports {
    fn default() -> Self {
        Ports::stdio()
    }
}

impl Ports {
    /// No input; both outputs go to the process's stdout.
    pub fn stdio() -> Self {
        Ports {
            input: None,
            values: ValueSink::Stdout,
            bytes: ByteSink::Stdout,
        }
    }

    /// Ports whose outputs are collected in memory. Input is inherited from
    /// `self`.
    pub fn capture(&self) -> (Ports, Capture) {
        let (tx, rx) = channel::unbounded();
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let ports = Ports {
            input: self.input.clone(),
            values: ValueSink::Channel(tx),
            bytes: ByteSink::Buffer(Arc::clone(&buffer)),
        };
        (ports, Capture { values: rx, buffer })
    }

    /// Write a value. A consumer that has stopped reading is not an error;
    /// the value is dropped.
    pub fn put(&self, value: Value) {
        match &self.values {
            ValueSink::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout is not the script's failure.
                let _ = writeln!(out, "▶ {}", value.repr());
            }
            ValueSink::Channel(tx) => {
                let _ = tx.send(value);
            }
        }
    }

    pub fn write_bytes(&self, bytes: &[u8]) {
        match &self.bytes {
            ByteSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(bytes);
                let _ = out.flush();
            }
            ByteSink::Buffer(buffer) => buffer.lock().extend_from_slice(bytes),
        }
    }

    pub fn write_str(&self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Call `f` with each input value until the input is closed or `f`
    /// returns `false`. Without input, `f` is never called.
    pub fn for_each_input<E>(&self, mut f: impl FnMut(Value) -> Result<bool, E>) -> Result<(), E> {
        if let Some(input) = &self.input {
            for value in input {
                if !f(value)? {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// The collecting side of [`Ports::capture`].
pub struct Capture {
    values: Receiver<Value>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Everything written so far: values first, then byte output split into
    /// lines.
    ///
    /// Call after the capturing ports (and every clone of them) are done.
    pub fn finish(self) -> Vec<Value> {
        let (mut out, text) = self.finish_split();
        out.extend(split_lines(text.as_bytes()).map(Value::String));
        out
    }

    /// Values and the raw byte output, unsplit.
    pub fn finish_split(self) -> (Vec<Value>, String) {
        let values = self.values.try_iter().collect();
        let bytes = std::mem::take(&mut *self.buffer.lock());
        (values, String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Lines of `bytes`, without their terminators. A trailing newline does not
/// start an empty last line.
fn split_lines(bytes: &[u8]) -> impl Iterator<Item = String> + '_ {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let empty = bytes.is_empty();
    trimmed
        .split(|&b| b == b'\n')
        .filter(move |_| !empty)
        .map(|line| String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line)).into_owned())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_capture_orders_values_before_lines() {
        let (ports, capture) = Ports::stdio().capture();
        ports.write_str("one\ntwo\n");
        ports.put(Value::from("v"));
        drop(ports);
        assert_eq!(
            capture.finish(),
            vec![Value::from("v"), Value::from("one"), Value::from("two")]
        );
    }

    #[test]
    fn test_split_lines() {
        let lines = |s: &str| split_lines(s.as_bytes()).collect::<Vec<_>>();
        assert_eq!(lines(""), Vec::<String>::new());
        assert_eq!(lines("\n"), vec![""]);
        assert_eq!(lines("a\r\nb"), vec!["a", "b"]);
        assert_eq!(lines("a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_input_stops_early() {
        let (tx, rx) = channel::unbounded();
        for s in ["a", "b", "c"] {
            tx.send(Value::from(s)).unwrap();
        }
        drop(tx);
        let ports = Ports {
            input: Some(rx),
            ..Ports::stdio()
        };
        let mut seen = Vec::new();
        ports
            .for_each_input(|v| -> Result<bool, ()> {
                seen.push(v);
                Ok(seen.len() < 2)
            })
            .unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_send_to_closed_channel_is_ignored() {
        let (tx, rx) = channel::unbounded();
        drop(rx);
        let ports = Ports {
            values: ValueSink::Channel(tx),
            ..Ports::stdio()
        };
        ports.put(Value::from("dropped"));
    }
}
