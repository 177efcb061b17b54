// src/auction/ascending.rs

//! Ascending (English) auction with soft close.
//!
//! The highest strictly-greater bid wins. A qualifying bid near the end of
//! the auction extends the deadline so other bidders get a chance to react
//! (the "soft close"); an auction that has already been marked endable is
//! promoted back to running by such a bid.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::auction::{AuctionIo, AuctionLogic, Handler, HandlerError};
use crate::errors::GavelError;
use crate::protocol::Params;

const START_MSG: &str = "start";
const STATUS_MSG: &str = "status";
const STOP_MSG: &str = "stop";
const BID_MSG: &str = "bid";

const TIMER_KEY: &str = "timer";
const BIDDER_KEY: &str = "bidder";
const BID_KEY: &str = "bid";

/// Time given to bidders at the start of the auction.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum time remaining after a qualifying bid.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AscendingAuction {
    high_bidder: Option<String>,
    high_bid: i64,
    end_time: Instant,
    max_timeout: Duration,
    min_timeout: Duration,
}

impl AscendingAuction {
    pub fn new() -> Self {
        Self {
            high_bidder: None,
            high_bid: 0,
            end_time: Instant::now(),
            max_timeout: MAX_TIMEOUT,
            min_timeout: MIN_TIMEOUT,
        }
    }

    /// Build from configuration params. The reference variant requires
    /// none; `max_timeout_secs` / `min_timeout_secs` optionally override
    /// the soft-close constants.
    pub fn from_params(params: &Params) -> Result<Self, GavelError> {
        let mut auction = Self::new();
        if let Some(value) = params.get("max_timeout_secs") {
            auction.max_timeout = parse_secs("max_timeout_secs", value)?;
        }
        if let Some(value) = params.get("min_timeout_secs") {
            auction.min_timeout = parse_secs("min_timeout_secs", value)?;
        }
        Ok(auction)
    }

    fn remaining(&self) -> Duration {
        self.end_time.saturating_duration_since(Instant::now())
    }

    fn send_start(&mut self, io: &AuctionIo) {
        self.end_time = Instant::now() + self.max_timeout;
        let mut args = Params::new();
        args.insert(TIMER_KEY.to_string(), self.max_timeout.as_secs().to_string());
        io.send_message(START_MSG, args);
    }

    fn send_status(&self, io: &AuctionIo) {
        let mut args = Params::new();
        args.insert(TIMER_KEY.to_string(), self.remaining().as_secs().to_string());
        if let Some(ref bidder) = self.high_bidder {
            args.insert(BIDDER_KEY.to_string(), bidder.clone());
            args.insert(BID_KEY.to_string(), self.high_bid.to_string());
        }
        io.send_message(STATUS_MSG, args);
    }

    fn send_stop(&self, io: &AuctionIo) {
        let mut args = Params::new();
        if let Some(ref bidder) = self.high_bidder {
            args.insert(BIDDER_KEY.to_string(), bidder.clone());
            args.insert(BID_KEY.to_string(), self.high_bid.to_string());
        }
        io.send_message(STOP_MSG, args);
    }

    fn handle_bid(&mut self, io: &AuctionIo, args: &Params) -> Result<(), HandlerError> {
        let bidder = args
            .get(BIDDER_KEY)
            .ok_or(HandlerError::MissingKey(BIDDER_KEY))?;
        let bid = args.get(BID_KEY).ok_or(HandlerError::MissingKey(BID_KEY))?;
        let bid: i64 = bid.parse().map_err(|_| HandlerError::InvalidValue {
            key: BID_KEY,
            value: bid.clone(),
        })?;

        // Equal or lower bids are dropped without a response.
        if bid <= self.high_bid {
            debug!(task = io.task_id(), bid, high = self.high_bid, "ignoring low bid");
            return Ok(());
        }

        self.high_bidder = Some(bidder.clone());
        self.high_bid = bid;

        // Soft close: keep at least `min_timeout` on the clock.
        if self.remaining() < self.min_timeout {
            self.end_time = Instant::now() + self.min_timeout;
        }

        // A bid that lands while we are endable puts us back in play; the
        // idle check will re-mark us endable when the timer runs out again.
        io.resume();

        self.send_status(io);
        Ok(())
    }
}

impl Default for AscendingAuction {
    fn default() -> Self {
        Self::new()
    }
}

impl AuctionLogic for AscendingAuction {
    fn handlers() -> HashMap<&'static str, Handler<Self>> {
        let mut handlers: HashMap<&'static str, Handler<Self>> = HashMap::new();
        handlers.insert(BID_MSG, Self::handle_bid);
        handlers
    }

    fn initialize(&mut self, io: &AuctionIo) {
        self.send_start(io);
    }

    fn idle(&mut self, io: &AuctionIo) {
        if Instant::now() >= self.end_time {
            io.mark_endable();
        }
    }

    fn resolve(&mut self, io: &AuctionIo) {
        self.send_stop(io);
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, GavelError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| GavelError::ConfigError(format!("invalid {key}: '{value}'")))
}
