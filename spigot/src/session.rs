//! Process session: spawn a command, drain it, feed it, wait for it.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::drain::{spawn_drain, StreamKind};
use crate::error::{Error, Result};
use crate::input::StdinHandle;
use crate::observer::{LineObserver, ObserverSet};
use crate::output::OutputBuffer;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No process has been spawned yet.
    Idle,
    /// A run is in flight: the child is live or its drains are finishing.
    Running,
    /// The most recent run has quiesced and been reaped.
    Exited,
}

/// A run in flight: the child plus everything needed to join it.
struct ActiveRun {
    child: Child,
    stdin: StdinHandle,
    drains: Vec<JoinHandle<()>>,
}

/// Wraps one external command: spawns it, drains stdout and stderr
/// concurrently, forwards every line to registered observers, and keeps the
/// combined output for retrieval at any time.
///
/// The command string is split on whitespace; the first token is the
/// program, the rest are its arguments. No shell is involved.
///
/// A session runs one process at a time but can be reused: once a run has
/// quiesced, the next start spawns again, appending to the same output
/// buffer.
///
/// # Example
///
/// ```rust,no_run
/// use spigot::Session;
///
/// #[tokio::main]
/// async fn main() -> spigot::Result<()> {
///     let mut session = Session::new("ls -la /tmp");
///     let status = session.run().await?;
///
///     println!("exit code: {:?}", status.code());
///     print!("{}", session.output());
///     Ok(())
/// }
/// ```
pub struct Session {
    command: String,
    observers: ObserverSet,
    output: OutputBuffer,
    state: SessionState,
    run: Option<ActiveRun>,
}

impl Session {
    /// Create a session for `command`. Nothing is spawned until a start
    /// call.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            observers: ObserverSet::new(),
            output: OutputBuffer::new(),
            state: SessionState::Idle,
            run: None,
        }
    }

    /// Register an observer with both streams' drain tasks.
    ///
    /// Takes effect from the next line drained; lines drained earlier are
    /// never replayed. Registering the same `Arc` twice is a no-op.
    pub fn add_observer(&self, observer: Arc<dyn LineObserver>) {
        self.observers.add(observer);
    }

    /// The command the next start will run.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Replace the command used by the next start. A run already in flight
    /// is not affected.
    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    /// Everything drained so far: both streams interleaved in read order,
    /// one `\n`-terminated line at a time.
    ///
    /// Valid at any point. Mid-run it returns the partial output; after
    /// [`wait`] returns, the result is complete and stable. A reused
    /// session keeps appending to the same buffer across runs.
    ///
    /// [`wait`]: Session::wait
    pub fn output(&self) -> String {
        self.output.snapshot()
    }

    /// Stdin handle of the run in flight, if any.
    pub fn stdin(&self) -> Option<StdinHandle> {
        self.run.as_ref().map(|run| run.stdin.clone())
    }

    /// Current lifecycle state.
    ///
    /// `Exited` means a quiesced run was reaped, by [`wait`] or by the next
    /// start. A child that dies while nobody waits still reads `Running`.
    ///
    /// [`wait`]: Session::wait
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Spawn the command and return without blocking.
    ///
    /// Both output streams are piped and a drain task per stream starts
    /// immediately. The returned [`StdinHandle`] writes to the child; clones
    /// of it are also passed to every observer notification.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if a previous run has not quiesced yet,
    /// [`Error::EmptyCommand`] if the command has no tokens, and
    /// [`Error::Spawn`] if the program cannot be executed. A failed spawn
    /// leaves the session unchanged, so the command can be fixed and
    /// started again.
    pub async fn start(&mut self) -> Result<StdinHandle> {
        self.reap_finished();
        if self.run.is_some() {
            return Err(Error::Busy);
        }

        let mut tokens = self.command.split_whitespace();
        let program = tokens.next().ok_or(Error::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(tokens)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: self.command.clone(),
                source,
            })?;

        debug!(command = %self.command, pid = ?child.id(), "spawned process");

        let stdin = StdinHandle::new(child.stdin.take());

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(
                stdout,
                StreamKind::Stdout,
                self.output.clone(),
                self.observers.clone(),
                stdin.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(
                stderr,
                StreamKind::Stderr,
                self.output.clone(),
                self.observers.clone(),
                stdin.clone(),
            ));
        }

        self.run = Some(ActiveRun {
            child,
            stdin: stdin.clone(),
            drains,
        });
        self.state = SessionState::Running;
        Ok(stdin)
    }

    /// [`start`], then write each item of `lines` as one stdin line.
    ///
    /// Lines are written in order, each flushed before the next. A failed
    /// write aborts the remaining lines and surfaces as [`Error::Stdin`];
    /// the run itself stays in flight.
    ///
    /// [`start`]: Session::start
    pub async fn start_with_input<I, S>(&mut self, lines: I) -> Result<StdinHandle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stdin = self.start().await?;
        for line in lines {
            stdin.write_line(line.as_ref()).await?;
        }
        Ok(stdin)
    }

    /// Block until the run in flight has fully quiesced, then return the
    /// child's exit status.
    ///
    /// Quiescence is a hard barrier: both drain tasks have hit end-of-file
    /// and the child has been reaped. After this returns, [`output`] is
    /// complete, no observer will be notified again for this run, and the
    /// session can start the next run.
    ///
    /// End-of-file arrives when the last writer to a pipe exits, so a child
    /// that hands its pipes to a longer-lived grandchild delays this call
    /// until the grandchild closes them. A child that blocks reading stdin
    /// must be fed or have its [`StdinHandle`] closed, or this call waits
    /// forever.
    ///
    /// # Errors
    ///
    /// [`Error::NotRunning`] if no run is in flight, [`Error::Wait`] if the
    /// child cannot be reaped.
    ///
    /// [`output`]: Session::output
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let Some(mut run) = self.run.take() else {
            return Err(Error::NotRunning);
        };

        // Joining the drains first guarantees every line the pipes carried
        // is in the buffer and dispatched before the child is reaped.
        for drain in run.drains {
            if let Err(error) = drain.await {
                warn!(error = %error, "drain task failed");
            }
        }

        let result = run.child.wait().await;
        self.state = SessionState::Exited;
        let status = result.map_err(Error::Wait)?;
        debug!(code = ?status.code(), "process exited");
        Ok(status)
    }

    /// Run the command to completion: [`start`] followed by [`wait`].
    ///
    /// [`start`]: Session::start
    /// [`wait`]: Session::wait
    pub async fn run(&mut self) -> Result<ExitStatus> {
        self.start().await?;
        self.wait().await
    }

    /// Run the command to completion, writing `lines` to its stdin first.
    ///
    /// Like [`start_with_input`] followed by [`wait`]. The child still owns
    /// its exit: a child that expects end-of-file on stdin needs its stdin
    /// handle closed, which this call does not do.
    ///
    /// [`start_with_input`]: Session::start_with_input
    /// [`wait`]: Session::wait
    pub async fn run_with_input<I, S>(&mut self, lines: I) -> Result<ExitStatus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.start_with_input(lines).await?;
        self.wait().await
    }

    /// Reap a previous run that has already quiesced, freeing the session
    /// for reuse without an explicit wait.
    fn reap_finished(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if !run.drains.iter().all(JoinHandle::is_finished) {
            return;
        }
        match run.child.try_wait() {
            Ok(Some(status)) => {
                debug!(code = ?status.code(), "reaped finished run");
                self.run = None;
                self.state = SessionState::Exited;
            }
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "could not poll previous run, treating it as active");
            }
        }
    }
}
