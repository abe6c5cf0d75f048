//! Append-only accumulator for drained output.

use std::sync::{Arc, Mutex};

/// Combined output of the wrapped command, one `\n`-terminated line at a
/// time, both streams interleaved in the order the drain tasks read them.
///
/// Clones share the same storage, so the two drain tasks and the session all
/// append to and read from one buffer. The buffer is never truncated: when a
/// session is reused for another run, new output keeps appending after the
/// old.
#[derive(Clone, Default)]
pub(crate) struct OutputBuffer {
    text: Arc<Mutex<String>>,
}

impl OutputBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append one line, adding the `\n` terminator.
    pub(crate) fn append_line(&self, line: &str) {
        let mut text = self.text.lock().expect("output buffer lock poisoned");
        text.push_str(line);
        text.push('\n');
    }

    /// Copy of everything accumulated so far.
    pub(crate) fn snapshot(&self) -> String {
        self.text.lock().expect("output buffer lock poisoned").clone()
    }
}
