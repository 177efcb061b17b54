// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::auction::factory;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{GavelError, Result};
use crate::task::TaskId;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GavelError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.coordinator, raw.auction))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_auctions(cfg)?;
    validate_coordinator(cfg)?;
    let ids = validate_unique_ids(cfg)?;
    validate_auction_types(cfg)?;
    validate_dependencies(cfg, &ids)?;
    validate_start_dag(cfg)?;
    Ok(())
}

fn ensure_has_auctions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.auction.is_empty() {
        return Err(GavelError::ConfigError(
            "config must contain at least one [[auction]] block".to_string(),
        ));
    }
    Ok(())
}

fn validate_coordinator(cfg: &RawConfigFile) -> Result<()> {
    if cfg.coordinator.max_clients == 0 {
        return Err(GavelError::ConfigError(
            "[coordinator].max_clients must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_unique_ids(cfg: &RawConfigFile) -> Result<HashSet<TaskId>> {
    let mut ids = HashSet::new();
    for auction in cfg.auction.iter() {
        if !ids.insert(auction.id) {
            return Err(GavelError::ConfigError(format!(
                "duplicate auction id {}",
                auction.id
            )));
        }
    }
    Ok(ids)
}

fn validate_auction_types(cfg: &RawConfigFile) -> Result<()> {
    for auction in cfg.auction.iter() {
        if !factory::is_registered(&auction.kind) {
            return Err(GavelError::ConfigError(format!(
                "auction {} has unknown type '{}' (known: {})",
                auction.id,
                auction.kind,
                factory::registered_kinds().join(", ")
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile, ids: &HashSet<TaskId>) -> Result<()> {
    for auction in cfg.auction.iter() {
        for dep in auction.start_after.iter().chain(auction.end_with.iter()) {
            if !ids.contains(dep) {
                return Err(GavelError::ConfigError(format!(
                    "auction {} references unknown auction {}",
                    auction.id, dep
                )));
            }
            if *dep == auction.id {
                return Err(GavelError::SelfDependency(auction.id));
            }
        }
    }
    Ok(())
}

fn validate_start_dag(cfg: &RawConfigFile) -> Result<()> {
    // Build a petgraph graph over the start dependencies.
    //
    // Edge direction: dep -> auction. For
    //   [[auction]]
    //   id = 2
    //   start_after = [1]
    // we add edge 1 -> 2.
    //
    // Only the start graph must be acyclic; mutual end dependencies are
    // legal ("end together") and are not checked here.
    let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();

    for auction in cfg.auction.iter() {
        graph.add_node(auction.id);
    }

    for auction in cfg.auction.iter() {
        for dep in auction.start_after.iter() {
            graph.add_edge(*dep, auction.id, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GavelError::DagCycle(format!(
            "cycle involving auction {}",
            cycle.node_id()
        ))),
    }
}
