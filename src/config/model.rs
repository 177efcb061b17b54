// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::task::{SessionId, TaskId};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [coordinator]
/// port = 1300
/// max_clients = 2
///
/// [[auction]]
/// id = 1
/// type = "ascending"
///
/// [[auction]]
/// id = 2
/// type = "ascending"
/// start_after = [1]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Listener and session settings from `[coordinator]`.
    #[serde(default)]
    pub coordinator: CoordinatorSection,

    /// All auction tasks from `[[auction]]` blocks.
    #[serde(default)]
    pub auction: Vec<AuctionConfig>,
}

/// `[coordinator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSection {
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Stop accepting once this many bidders have connected.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Length of the accept window in seconds.
    #[serde(default = "default_max_wait_time_secs")]
    pub max_wait_time_secs: u64,

    /// Session id stamped on every task and outbound message.
    #[serde(default = "default_session_id")]
    pub session_id: SessionId,

    /// Pause between the spec broadcast and schedule execution, in seconds.
    #[serde(default = "default_pre_start_grace_secs")]
    pub pre_start_grace_secs: u64,

    /// Per-task pause between resolution and `Ended`, in seconds.
    #[serde(default = "default_resolve_grace_secs")]
    pub resolve_grace_secs: u64,
}

fn default_port() -> u16 {
    1300
}

fn default_max_clients() -> usize {
    8
}

fn default_max_wait_time_secs() -> u64 {
    10
}

fn default_session_id() -> SessionId {
    1
}

fn default_pre_start_grace_secs() -> u64 {
    5
}

fn default_resolve_grace_secs() -> u64 {
    5
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_clients: default_max_clients(),
            max_wait_time_secs: default_max_wait_time_secs(),
            session_id: default_session_id(),
            pre_start_grace_secs: default_pre_start_grace_secs(),
            resolve_grace_secs: default_resolve_grace_secs(),
        }
    }
}

/// One `[[auction]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    /// Unique task id within the session.
    pub id: TaskId,

    /// Registered auction type name (e.g. `"ascending"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Start dependencies: this auction may not start until every listed
    /// task has ended.
    #[serde(default)]
    pub start_after: Vec<TaskId>,

    /// End dependencies: this auction may not be ended until every listed
    /// task is at least endable.
    #[serde(default)]
    pub end_with: Vec<TaskId>,

    /// Arbitrary key/value params fed verbatim into the auction.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Validated configuration.
///
/// Constructed via `ConfigFile::try_from(raw)` (see `validate`), which is
/// the only path the rest of the crate should use.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub coordinator: CoordinatorSection,
    pub auction: Vec<AuctionConfig>,
}

impl ConfigFile {
    /// Wrap already-validated sections. Callers outside `validate` should
    /// go through `TryFrom<RawConfigFile>` instead.
    pub fn new_unchecked(coordinator: CoordinatorSection, auction: Vec<AuctionConfig>) -> Self {
        Self {
            coordinator,
            auction,
        }
    }
}
