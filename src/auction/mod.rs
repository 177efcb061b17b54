// src/auction/mod.rs

//! Message-driven auction tasks.
//!
//! An auction is a [`Auction`] run loop (mailbox, dispatch, lifecycle)
//! composed with a pluggable [`AuctionLogic`]: the logic contributes the
//! `initialize` / `idle` / `resolve` hooks and a registry of per-message
//! handlers, and talks back to the world through [`AuctionIo`].
//!
//! - [`ascending`] is the reference English auction with soft close.
//! - [`factory`] builds auctions from configuration by type name.

pub mod ascending;
pub mod factory;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::protocol::{self, Params};
use crate::session::ClientSession;
use crate::task::{SessionId, TaskHandle, TaskId, TaskState, TaskStatus};

/// Bounded wait on the mailbox between `idle` hook invocations.
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(50);

/// Grace period between resolution and `Ended`, letting outbound writes
/// reach the clients before any successor task starts producing output.
pub const DEFAULT_RESOLVE_GRACE: Duration = Duration::from_secs(5);

/// Required routing keys on every inbound message.
pub const SESSION_KEY: &str = "sessionId";
pub const AUCTION_KEY: &str = "auctionId";

/// Argument error signalled by a message handler. The dispatch loop logs it
/// and carries on; it never crosses the task boundary.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid message: no {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// A per-message-type handler. Plain function pointers keep the registry
/// cheap to clone and make handler identity obvious in logs and tests.
pub type Handler<L> = fn(&mut L, &AuctionIo, &Params) -> Result<(), HandlerError>;

/// Domain logic plugged into the generic auction run loop.
pub trait AuctionLogic: Send + 'static {
    /// The handler registry for this logic: message type -> handler.
    fn handlers() -> HashMap<&'static str, Handler<Self>>
    where
        Self: Sized;

    /// Called once, immediately before the first mailbox poll.
    fn initialize(&mut self, _io: &AuctionIo) {}

    /// Called whenever the mailbox poll times out. Timed behavior (e.g.
    /// auction deadlines) lives here.
    fn idle(&mut self, _io: &AuctionIo) {}

    /// Called once after the run loop exits, before clients are released.
    fn resolve(&mut self, _io: &AuctionIo) {}
}

/// Capability surface handed to hooks and handlers: identity, broadcast
/// send, and the two logic-side state transitions.
#[derive(Clone)]
pub struct AuctionIo {
    status: Arc<TaskStatus>,
    clients: Vec<Arc<ClientSession>>,
}

impl AuctionIo {
    pub fn task_id(&self) -> TaskId {
        self.status.task_id()
    }

    pub fn session_id(&self) -> SessionId {
        self.status.session_id()
    }

    /// Broadcast a message to every bound client, decorated with this
    /// task's `sessionId` and `auctionId`.
    pub fn send_message(&self, msg_type: &str, mut args: Params) {
        args.insert(SESSION_KEY.to_string(), self.session_id().to_string());
        args.insert(AUCTION_KEY.to_string(), self.task_id().to_string());
        let line = protocol::encode(msg_type, &args);
        for client in &self.clients {
            client.send_line(line.clone());
        }
    }

    /// `Running -> Endable`; logic calls this when its end condition holds.
    pub fn mark_endable(&self) -> bool {
        self.status.mark_endable()
    }

    /// `Endable -> Running`; logic calls this to cancel a pending end.
    pub fn resume(&self) -> bool {
        self.status.resume()
    }
}

/// Generic auction task: run loop, mailbox, handler dispatch.
pub struct Auction<L: AuctionLogic> {
    io: AuctionIo,
    params: Params,
    handlers: HashMap<&'static str, Handler<L>>,
    logic: L,
    mailbox_tx: mpsc::UnboundedSender<String>,
    mailbox_rx: mpsc::UnboundedReceiver<String>,
    resolve_grace: Duration,
}

impl<L: AuctionLogic> Auction<L> {
    pub fn new(task_id: TaskId, session_id: SessionId, params: Params, logic: L) -> Self {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        Self {
            io: AuctionIo {
                status: Arc::new(TaskStatus::new(task_id, session_id)),
                clients: Vec::new(),
            },
            params,
            handlers: L::handlers(),
            logic,
            mailbox_tx,
            mailbox_rx,
            resolve_grace: DEFAULT_RESOLVE_GRACE,
        }
    }

    /// Bind the client set this auction talks to. Installed before the task
    /// runs and treated as immutable thereafter.
    pub fn set_clients(&mut self, clients: Vec<Arc<ClientSession>>) {
        self.io.clients = clients;
    }

    /// Override the resolve grace period (tests and configuration).
    pub fn set_resolve_grace(&mut self, grace: Duration) {
        self.resolve_grace = grace;
    }

    pub fn status(&self) -> Arc<TaskStatus> {
        Arc::clone(&self.io.status)
    }

    /// A clone of the send surface, usable before the task runs (e.g. for
    /// the spec broadcast).
    pub fn io(&self) -> AuctionIo {
        self.io.clone()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Broadcast the auction specification: the `auction` message carrying
    /// every configuration param.
    pub fn send_spec(&self) {
        self.io.send_message("auction", self.params.clone());
    }

    /// Convert into a schedulable handle; the run loop becomes the handle's
    /// single-shot runner.
    pub fn into_handle(self) -> TaskHandle {
        let status = self.status();
        TaskHandle::new(status, self.run())
    }

    /// The task run loop. Single-shot: running anything but a `New` task
    /// returns immediately.
    pub async fn run(mut self) {
        if self.io.status.state() != TaskState::New {
            return;
        }
        self.io.status.start();

        for client in &self.io.clients {
            client.register(self.io.task_id(), self.mailbox_tx.clone());
        }

        self.logic.initialize(&self.io);

        while self.io.status.state() < TaskState::Ending {
            let polled = timeout(IDLE_TIMEOUT, self.mailbox_rx.recv()).await;
            match polled {
                Err(_) => self.logic.idle(&self.io),
                Ok(Some(line)) => self.dispatch(&line),
                // Unreachable while we hold a sender, but harmless.
                Ok(None) => self.logic.idle(&self.io),
            }
        }

        self.logic.resolve(&self.io);

        for client in &self.io.clients {
            client.unregister(self.io.task_id());
        }

        // Drain outbound writes so clients see our resolution before a
        // successor task starts talking, then honor the grace period.
        for client in &self.io.clients {
            client.flush().await;
        }
        if !self.resolve_grace.is_zero() {
            tokio::time::sleep(self.resolve_grace).await;
        }

        self.io.status.finish();
    }

    /// Decode one inbound line and route it to its handler.
    fn dispatch(&mut self, line: &str) {
        let Some((msg_type, args)) = protocol::decode(line) else {
            return;
        };

        let Some(session_id) = args.get(SESSION_KEY) else {
            warn!(task = self.io.task_id(), "invalid message: no {SESSION_KEY}");
            return;
        };
        let Some(auction_id) = args.get(AUCTION_KEY) else {
            warn!(task = self.io.task_id(), "invalid message: no {AUCTION_KEY}");
            return;
        };

        let (Ok(session_id), Ok(auction_id)) =
            (session_id.parse::<SessionId>(), auction_id.parse::<TaskId>())
        else {
            warn!(task = self.io.task_id(), line, "invalid message: bad routing ids");
            return;
        };

        // Silently ignore messages meant for other sessions or auctions.
        if session_id != self.io.session_id() || auction_id != self.io.task_id() {
            debug!(
                task = self.io.task_id(),
                session_id, auction_id, "dropping message for another task"
            );
            return;
        }

        match self.handlers.get(msg_type) {
            Some(handler) => {
                if let Err(e) = handler(&mut self.logic, &self.io, &args) {
                    warn!(task = self.io.task_id(), error = %e, "handler rejected message");
                }
            }
            None => warn!(task = self.io.task_id(), msg_type, "unknown message type"),
        }
    }
}
