#![allow(dead_code)]

use std::collections::BTreeMap;

use gavel::config::{AuctionConfig, ConfigFile, CoordinatorSection, RawConfigFile};
use gavel::task::{SessionId, TaskId};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                coordinator: CoordinatorSection::default(),
                auction: Vec::new(),
            },
        }
    }

    pub fn with_auction(mut self, auction: AuctionConfig) -> Self {
        self.config.auction.push(auction);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.coordinator.port = port;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.config.coordinator.max_clients = max_clients;
        self
    }

    pub fn with_max_wait_time_secs(mut self, secs: u64) -> Self {
        self.config.coordinator.max_wait_time_secs = secs;
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.config.coordinator.session_id = session_id;
        self
    }

    /// Zero both grace periods so tests run at full speed.
    pub fn without_graces(mut self) -> Self {
        self.config.coordinator.pre_start_grace_secs = 0;
        self.config.coordinator.resolve_grace_secs = 0;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Like `build`, but surfacing the validation error for tests that
    /// expect one.
    pub fn try_build(self) -> gavel::errors::Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `AuctionConfig`.
pub struct AuctionConfigBuilder {
    auction: AuctionConfig,
}

impl AuctionConfigBuilder {
    pub fn new(id: TaskId) -> Self {
        Self {
            auction: AuctionConfig {
                id,
                kind: "ascending".to_string(),
                start_after: Vec::new(),
                end_with: Vec::new(),
                params: BTreeMap::new(),
            },
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.auction.kind = kind.to_string();
        self
    }

    pub fn start_after(mut self, dep: TaskId) -> Self {
        self.auction.start_after.push(dep);
        self
    }

    pub fn end_with(mut self, dep: TaskId) -> Self {
        self.auction.end_with.push(dep);
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.auction.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Short auction timers so wall-clock tests stay fast.
    pub fn fast_timers(self) -> Self {
        self.param("max_timeout_secs", "1").param("min_timeout_secs", "1")
    }

    pub fn build(self) -> AuctionConfig {
        self.auction
    }
}
