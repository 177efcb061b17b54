// src/session.rs

//! One bidder connection.
//!
//! A [`ClientSession`] owns its byte stream through two background tasks:
//!
//! - a reader that turns the stream into lines and fans each line out into
//!   every currently registered task mailbox;
//! - a writer that serializes concurrent senders through a channel, appends
//!   the line terminator and flushes.
//!
//! The session never interprets message content; it is a passive router.
//! Registration and inbound dispatch are interleavable: the subscriber list
//! is held only long enough to snapshot the mailboxes for one line, so a
//! task that unregisters mid-iteration may still receive one more line
//! (tolerated by the task-side session/auction filter).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::task::TaskId;

struct Subscriber {
    task_id: TaskId,
    mailbox: mpsc::UnboundedSender<String>,
}

enum WriterCmd {
    Line(String),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// A single bidder's connection.
pub struct ClientSession {
    peer: SocketAddr,
    subscribers: Mutex<Vec<Subscriber>>,
    writer_tx: mpsc::UnboundedSender<WriterCmd>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ClientSession {
    /// Spawn the reader and writer tasks for `stream` and return the shared
    /// session.
    ///
    /// Generic over the stream so tests can drive a session through
    /// `tokio::io::duplex` while production passes a `TcpStream`.
    pub fn spawn<S>(stream: S, peer: SocketAddr) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            peer,
            subscribers: Mutex::new(Vec::new()),
            writer_tx,
            reader: Mutex::new(None),
        });

        let reader = tokio::spawn(Self::read_loop(Arc::clone(&session), read_half));
        *session.reader.lock().expect("reader handle poisoned") = Some(reader);
        tokio::spawn(Self::write_loop(peer, write_half, writer_rx));

        session
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Register a task mailbox; every subsequent inbound line is copied
    /// into it. Registration order is preserved.
    pub fn register(&self, task_id: TaskId, mailbox: mpsc::UnboundedSender<String>) {
        let mut subs = self.subscribers.lock().expect("subscriber list poisoned");
        subs.push(Subscriber { task_id, mailbox });
        debug!(peer = %self.peer, task = task_id, "task registered with client");
    }

    /// Remove every registration for `task_id`. Unknown ids are ignored.
    pub fn unregister(&self, task_id: TaskId) {
        let mut subs = self.subscribers.lock().expect("subscriber list poisoned");
        subs.retain(|s| s.task_id != task_id);
        debug!(peer = %self.peer, task = task_id, "task unregistered from client");
    }

    /// Queue one line for the writer. Never blocks the caller; lines from
    /// concurrent senders are written in queue order.
    pub fn send_line(&self, line: String) {
        if self.writer_tx.send(WriterCmd::Line(line)).is_err() {
            debug!(peer = %self.peer, "send after writer shut down; dropping line");
        }
    }

    /// Wait until every line queued so far has been written and flushed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.writer_tx.send(WriterCmd::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Shut the connection down: the writer closes its half of the stream
    /// and the reader task is stopped.
    pub fn close(&self) {
        let _ = self.writer_tx.send(WriterCmd::Shutdown);
        if let Some(reader) = self.reader.lock().expect("reader handle poisoned").take() {
            reader.abort();
        }
    }

    async fn read_loop<R>(session: Arc<Self>, read_half: R)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    // Snapshot the mailboxes so the list is not held across
                    // the sends.
                    let mailboxes: Vec<mpsc::UnboundedSender<String>> = {
                        let subs =
                            session.subscribers.lock().expect("subscriber list poisoned");
                        subs.iter().map(|s| s.mailbox.clone()).collect()
                    };
                    for mailbox in mailboxes {
                        // A task that already finished has dropped its
                        // receiver; that is not an error.
                        let _ = mailbox.send(line.clone());
                    }
                }
                Ok(None) => {
                    debug!(peer = %session.peer, "client disconnected");
                    break;
                }
                Err(e) => {
                    warn!(peer = %session.peer, error = %e, "failed to read from client");
                    break;
                }
            }
        }
    }

    async fn write_loop<W>(
        peer: SocketAddr,
        mut write_half: W,
        mut rx: mpsc::UnboundedReceiver<WriterCmd>,
    ) where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                WriterCmd::Line(mut line) => {
                    line.push('\n');
                    if let Err(e) = write_half.write_all(line.as_bytes()).await {
                        warn!(peer = %peer, error = %e, "failed to write to client");
                        break;
                    }
                    if let Err(e) = write_half.flush().await {
                        warn!(peer = %peer, error = %e, "failed to flush client stream");
                        break;
                    }
                }
                WriterCmd::Flush(ack) => {
                    let _ = write_half.flush().await;
                    let _ = ack.send(());
                }
                WriterCmd::Shutdown => {
                    let _ = write_half.shutdown().await;
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
