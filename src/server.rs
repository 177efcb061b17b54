// src/server.rs

//! The coordinator: accepts bidder connections, wires them to the
//! configured auctions and runs the schedule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{info, warn};

use crate::auction::factory;
use crate::config::model::ConfigFile;
use crate::errors::{GavelError, Result};
use crate::sched::Schedule;
use crate::session::ClientSession;
use crate::task::{TaskHandle, TaskId};

/// A coordinator bound to its listening socket.
///
/// Binding is split from running so callers (and tests) can bind to port 0
/// and discover the actual address before any client connects.
pub struct Coordinator {
    cfg: ConfigFile,
    listener: TcpListener,
}

impl Coordinator {
    /// Bind the listening socket. A bind failure is fatal to the run.
    pub async fn bind(cfg: ConfigFile) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", cfg.coordinator.port)).await?;
        info!(addr = %listener.local_addr()?, "listening for bidder connections");
        Ok(Self { cfg, listener })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run one coordinator session to completion.
    ///
    /// 1. Accept up to `max_clients` bidders within the accept window.
    /// 2. Build every auction, bound to the client set and session id.
    /// 3. Broadcast each auction's specification.
    /// 4. Wait the pre-start grace, then execute the schedule.
    /// 5. Close every client.
    pub async fn run(self) -> Result<()> {
        let clients = self.wait_for_clients().await;
        if clients.is_empty() {
            warn!("failed to receive any connections");
            return Err(GavelError::NoClients);
        }

        let session_id = self.cfg.coordinator.session_id;
        let resolve_grace = Duration::from_secs(self.cfg.coordinator.resolve_grace_secs);

        let schedule = Schedule::from_config(&self.cfg)?;

        let mut built = Vec::with_capacity(self.cfg.auction.len());
        for auction_cfg in self.cfg.auction.iter() {
            built.push(factory::build_auction(
                auction_cfg,
                session_id,
                clients.clone(),
                resolve_grace,
            )?);
        }

        // Tell the bidders what is coming before anything starts.
        for auction in &built {
            auction.send_spec();
        }

        let pre_start = Duration::from_secs(self.cfg.coordinator.pre_start_grace_secs);
        if !pre_start.is_zero() {
            sleep(pre_start).await;
        }

        let tasks: HashMap<TaskId, TaskHandle> =
            built.into_iter().map(|a| a.into_handle()).collect();

        info!(tasks = tasks.len(), session = session_id, "executing schedule");
        schedule.execute(tasks).await?;
        info!("schedule complete");

        for client in &clients {
            client.close();
        }
        Ok(())
    }

    /// Accept connections until the window closes or the client limit is
    /// reached. Per-connection failures are logged; an accept timeout is
    /// not an error.
    async fn wait_for_clients(&self) -> Vec<Arc<ClientSession>> {
        let max_clients = self.cfg.coordinator.max_clients;
        let deadline =
            Instant::now() + Duration::from_secs(self.cfg.coordinator.max_wait_time_secs);

        let mut clients = Vec::new();
        while clients.len() < max_clients {
            match timeout_at(deadline, self.listener.accept()).await {
                Err(_) => {
                    info!("accept window closed");
                    break;
                }
                Ok(Ok((stream, peer))) => {
                    info!(%peer, "received connection");
                    clients.push(ClientSession::spawn(stream, peer));
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "error accepting connection");
                    break;
                }
            }
        }
        clients
    }
}
