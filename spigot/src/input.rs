//! Shared write handle for the child's stdin.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Clonable writer for the wrapped command's standard input.
///
/// The session hands one handle to the caller and passes it to every
/// observer notification, so an observer can answer a prompt line by writing
/// back to the child. Every write flushes before returning. [`close`] drops
/// the pipe so the child sees end-of-file; writes after that fail with
/// [`Error::StdinClosed`].
///
/// [`close`]: StdinHandle::close
#[derive(Clone, Debug)]
pub struct StdinHandle {
    inner: Arc<Mutex<Option<ChildStdin>>>,
}

impl StdinHandle {
    pub(crate) fn new(stdin: Option<ChildStdin>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stdin)),
        }
    }

    /// Write `text` exactly as given and flush.
    pub async fn write(&self, text: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let stdin = guard.as_mut().ok_or(Error::StdinClosed)?;
        stdin.write_all(text.as_bytes()).await.map_err(Error::Stdin)?;
        stdin.flush().await.map_err(Error::Stdin)
    }

    /// Write `line` with a trailing newline and flush.
    ///
    /// The lock is held across write and flush, so lines from concurrent
    /// writers never interleave.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let stdin = guard.as_mut().ok_or(Error::StdinClosed)?;
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(Error::Stdin)?;
        stdin.flush().await.map_err(Error::Stdin)
    }

    /// Close the pipe, delivering end-of-file to the child. Idempotent.
    pub async fn close(&self) {
        self.inner.lock().await.take();
    }

    /// Whether the pipe has been closed, or was never piped at all.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
