// src/auction/factory.rs

//! Construction of auction tasks from configuration by type name.

use std::sync::Arc;
use std::time::Duration;

use crate::auction::ascending::AscendingAuction;
use crate::auction::{Auction, AuctionIo};
use crate::config::model::AuctionConfig;
use crate::errors::{GavelError, Result};
use crate::protocol::Params;
use crate::session::ClientSession;
use crate::task::{SessionId, TaskHandle, TaskId};

/// Type names accepted in `[[auction]].type`.
const KINDS: &[&str] = &["ascending"];

/// Whether `kind` names a registered auction type.
pub fn is_registered(kind: &str) -> bool {
    KINDS.contains(&kind)
}

/// The registered auction type names, for error messages.
pub fn registered_kinds() -> Vec<&'static str> {
    KINDS.to_vec()
}

/// A fully wired auction, ready for the spec broadcast and scheduling.
pub struct BuiltAuction {
    io: AuctionIo,
    params: Params,
    handle: TaskHandle,
}

impl BuiltAuction {
    pub fn task_id(&self) -> TaskId {
        self.io.task_id()
    }

    /// Broadcast the `auction` specification message carrying every param.
    pub fn send_spec(&self) {
        self.io.send_message("auction", self.params.clone());
    }

    pub fn into_handle(self) -> (TaskId, TaskHandle) {
        (self.io.task_id(), self.handle)
    }
}

/// Build one auction from its config block, bound to the given clients.
///
/// Unknown type names are a configuration error; validation normally
/// rejects them before this point.
pub fn build_auction(
    cfg: &AuctionConfig,
    session_id: SessionId,
    clients: Vec<Arc<ClientSession>>,
    resolve_grace: Duration,
) -> Result<BuiltAuction> {
    match cfg.kind.as_str() {
        "ascending" => {
            let logic = AscendingAuction::from_params(&cfg.params)?;
            let mut auction = Auction::new(cfg.id, session_id, cfg.params.clone(), logic);
            auction.set_clients(clients);
            auction.set_resolve_grace(resolve_grace);
            Ok(BuiltAuction {
                io: auction.io(),
                params: auction.params().clone(),
                handle: auction.into_handle(),
            })
        }
        other => Err(GavelError::ConfigError(format!(
            "unknown auction type '{other}' for auction {}",
            cfg.id
        ))),
    }
}
