//! Per-line observer capability.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::input::StdinHandle;

/// Callback notified for every line the drain tasks read.
///
/// Both streams feed the same observers. Notifications for one stream arrive
/// in read order from that stream's drain task; a slow observer stalls only
/// the stream that invoked it. The line has its terminator stripped and has
/// already been appended to the session's output buffer when the observer
/// runs.
///
/// The [`StdinHandle`] lets an observer answer a prompt by writing back to
/// the child:
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use spigot::{LineObserver, Session, StdinHandle};
///
/// struct AnswerPrompt;
///
/// #[async_trait]
/// impl LineObserver for AnswerPrompt {
///     async fn on_line(&self, line: &str, stdin: &StdinHandle) {
///         if line.ends_with("name?") {
///             let _ = stdin.write_line("spigot").await;
///         }
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> spigot::Result<()> {
///     let mut session = Session::new("sh ./greet.sh");
///     session.add_observer(Arc::new(AnswerPrompt));
///     session.run().await?;
///     print!("{}", session.output());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LineObserver: Send + Sync {
    /// Receive one output line, terminator stripped.
    async fn on_line(&self, line: &str, stdin: &StdinHandle);
}

/// Observer registry shared by the session and both drain tasks.
///
/// Iteration order is registration order. Registering the same `Arc` twice
/// is a no-op; two separate instances of the same type are both kept.
#[derive(Clone, Default)]
pub(crate) struct ObserverSet {
    observers: Arc<RwLock<Vec<Arc<dyn LineObserver>>>>,
}

impl ObserverSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Takes effect from the next line drained.
    pub(crate) fn add(&self, observer: Arc<dyn LineObserver>) {
        let mut observers = self.observers.write().expect("observer lock poisoned");
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return;
        }
        observers.push(observer);
    }

    /// Snapshot for one dispatch round; the lock is never held across an
    /// await.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn LineObserver>> {
        self.observers.read().expect("observer lock poisoned").clone()
    }
}
