//! Spigot - tap the output of an external command, line by line.
//!
//! A [`Session`] spawns one command with piped stdio, drains stdout and
//! stderr concurrently, and hands every line to registered observers while
//! accumulating the combined output. Observers receive a [`StdinHandle`]
//! with each line, so they can answer a prompt by writing back to the
//! child. Waiting on a session is a hard barrier: when it returns, both
//! streams are fully drained and the child has been reaped.
//!
//! ```rust,no_run
//! use spigot::Session;
//!
//! #[tokio::main]
//! async fn main() -> spigot::Result<()> {
//!     let mut session = Session::new("cargo --version");
//!     let status = session.run().await?;
//!
//!     assert!(status.success());
//!     print!("{}", session.output());
//!     Ok(())
//! }
//! ```

mod drain;
mod error;
mod input;
mod observer;
mod output;
mod session;

pub use error::{Error, Result};
pub use input::StdinHandle;
pub use observer::LineObserver;
pub use session::{Session, SessionState};
