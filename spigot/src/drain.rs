//! Stream drain tasks: one per child output stream.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::input::StdinHandle;
use crate::observer::ObserverSet;
use crate::output::OutputBuffer;

/// Which child stream a drain task reads. Log context only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Spawn a task that reads `stream` line by line until end-of-file.
///
/// For each line, in order: append it to `output`, then notify every
/// observer registered at that moment, passing `stdin` for write-back. A
/// read error is logged and ends the task without retry; lines already
/// drained stay in the buffer. The reader is released when the task ends.
pub(crate) fn spawn_drain<R>(
    stream: R,
    kind: StreamKind,
    output: OutputBuffer,
    observers: ObserverSet,
    stdin: StdinHandle,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream).lines();
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    output.append_line(&line);
                    // Snapshot per line: observers added during dispatch
                    // start with the next line, never a replay.
                    for observer in observers.snapshot() {
                        observer.on_line(&line, &stdin).await;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(
                        stream = kind.as_str(),
                        error = %error,
                        "read failed, stopping drain"
                    );
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncWriteExt, ReadBuf};
    use tokio::time::sleep;

    use crate::observer::LineObserver;

    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                lines: Mutex::new(Vec::new()),
            })
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LineObserver for Recorder {
        async fn on_line(&self, line: &str, _stdin: &StdinHandle) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    struct SlowObserver;

    #[async_trait]
    impl LineObserver for SlowObserver {
        async fn on_line(&self, _line: &str, _stdin: &StdinHandle) {
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// Yields `ok\n`, then fails with a broken pipe.
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
            } else {
                self.sent = true;
                buf.put_slice(b"ok\n");
                Poll::Ready(Ok(()))
            }
        }
    }

    fn drain_parts() -> (OutputBuffer, ObserverSet, StdinHandle) {
        (OutputBuffer::new(), ObserverSet::new(), StdinHandle::new(None))
    }

    #[tokio::test]
    async fn test_drains_lines_in_order() {
        let (output, observers, stdin) = drain_parts();
        let recorder = Recorder::new();
        observers.add(recorder.clone());

        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_drain(reader, StreamKind::Stdout, output.clone(), observers, stdin);

        writer.write_all(b"one\ntwo\nthree\n").await.unwrap();
        drop(writer);
        handle.await.unwrap();

        assert_eq!(output.snapshot(), "one\ntwo\nthree\n");
        assert_eq!(recorder.lines(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_unterminated_final_line_is_drained() {
        let (output, observers, stdin) = drain_parts();

        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_drain(reader, StreamKind::Stdout, output.clone(), observers, stdin);

        writer.write_all(b"done\npartial").await.unwrap();
        drop(writer);
        handle.await.unwrap();

        assert_eq!(output.snapshot(), "done\npartial\n");
    }

    #[tokio::test]
    async fn test_appends_before_notifying() {
        struct BufferCheck {
            output: OutputBuffer,
            seen: Mutex<Vec<bool>>,
        }

        #[async_trait]
        impl LineObserver for BufferCheck {
            async fn on_line(&self, line: &str, _stdin: &StdinHandle) {
                let appended = self.output.snapshot().contains(line);
                self.seen.lock().unwrap().push(appended);
            }
        }

        let (output, observers, stdin) = drain_parts();
        let check = Arc::new(BufferCheck {
            output: output.clone(),
            seen: Mutex::new(Vec::new()),
        });
        observers.add(check.clone());

        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_drain(reader, StreamKind::Stdout, output, observers, stdin);

        writer.write_all(b"alpha\nbeta\n").await.unwrap();
        drop(writer);
        handle.await.unwrap();

        assert_eq!(check.seen.lock().unwrap().clone(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_observer_added_mid_stream_sees_no_replay() {
        let (output, observers, stdin) = drain_parts();
        let early = Recorder::new();
        observers.add(early.clone());

        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_drain(
            reader,
            StreamKind::Stdout,
            output.clone(),
            observers.clone(),
            stdin,
        );

        // Once the first observer holds the line, the dispatch snapshot for
        // it is already fixed, so a new registration cannot join that round.
        writer.write_all(b"early\n").await.unwrap();
        for _ in 0..1000 {
            if !early.lines().is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(early.lines(), vec!["early"]);

        let late = Recorder::new();
        observers.add(late.clone());

        writer.write_all(b"late\n").await.unwrap();
        drop(writer);
        handle.await.unwrap();

        assert_eq!(late.lines(), vec!["late"]);
        assert_eq!(early.lines(), vec!["early", "late"]);
        assert_eq!(output.snapshot(), "early\nlate\n");
    }

    #[tokio::test]
    async fn test_read_error_stops_drain_keeping_prior_lines() {
        let (output, observers, stdin) = drain_parts();
        let recorder = Recorder::new();
        observers.add(recorder.clone());

        let handle = spawn_drain(
            FailingReader { sent: false },
            StreamKind::Stderr,
            output.clone(),
            observers,
            stdin,
        );
        handle.await.unwrap();

        assert_eq!(output.snapshot(), "ok\n");
        assert_eq!(recorder.lines(), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_stops_drain() {
        let (output, observers, stdin) = drain_parts();

        let (mut writer, reader) = tokio::io::duplex(64);
        let handle = spawn_drain(reader, StreamKind::Stdout, output.clone(), observers, stdin);

        writer.write_all(b"clean\n\xff\xfe\n").await.unwrap();
        drop(writer);
        handle.await.unwrap();

        assert_eq!(output.snapshot(), "clean\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_observer_stalls_only_its_stream() {
        let (output, observers, stdin) = drain_parts();
        observers.add(Arc::new(SlowObserver));

        let (mut writer_a, reader_a) = tokio::io::duplex(64);
        let (mut writer_b, reader_b) = tokio::io::duplex(64);
        writer_a.write_all(b"a1\na2\n").await.unwrap();
        writer_b.write_all(b"b1\nb2\n").await.unwrap();
        drop(writer_a);
        drop(writer_b);

        let started = tokio::time::Instant::now();
        let drain_a = spawn_drain(
            reader_a,
            StreamKind::Stdout,
            output.clone(),
            observers.clone(),
            stdin.clone(),
        );
        let drain_b = spawn_drain(
            reader_b,
            StreamKind::Stderr,
            output.clone(),
            observers,
            stdin,
        );
        drain_a.await.unwrap();
        drain_b.await.unwrap();

        // Two 100ms notifications per stream, overlapping across streams:
        // serialized drains would need 400ms.
        assert!(started.elapsed() < Duration::from_millis(350));

        let snapshot = output.snapshot();
        for line in ["a1\n", "a2\n", "b1\n", "b2\n"] {
            assert!(snapshot.contains(line), "missing {line:?} in {snapshot:?}");
        }
    }
}
