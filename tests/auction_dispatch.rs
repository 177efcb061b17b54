// tests/auction_dispatch.rs

//! Run-loop dispatch tests for the auction task base, driven through an
//! in-memory duplex stream instead of a TCP socket.

mod common;
use crate::common::{init_tracing, with_timeout};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::io::Lines;
use tokio::time::Duration;

use gavel::auction::ascending::AscendingAuction;
use gavel::auction::Auction;
use gavel::protocol::{decode, Params};
use gavel::session::ClientSession;
use gavel::task::{TaskState, TaskStatus};

struct Bidder {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Bidder {
    /// Send a raw protocol line to the auction.
    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("bidder write failed");
    }

    /// Read and decode the next server message.
    async fn recv(&mut self) -> (String, Params) {
        let line = with_timeout(self.lines.next_line())
            .await
            .expect("bidder read failed")
            .expect("server closed stream");
        let (msg_type, args) = decode(&line).expect("undecodable server line");
        (msg_type.to_string(), args)
    }
}

fn fake_addr() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// Spawn an ascending auction bound to one duplex-backed client and return
/// the bidder half plus the task's status.
fn spawn_auction(task_id: u32, session_id: u32) -> (Bidder, Arc<TaskStatus>) {
    let (server_io, client_io) = tokio::io::duplex(4096);
    let session = ClientSession::spawn(server_io, fake_addr());

    let mut auction = Auction::new(
        task_id,
        session_id,
        Params::new(),
        AscendingAuction::new(),
    );
    auction.set_clients(vec![session]);
    auction.set_resolve_grace(Duration::ZERO);
    let status = auction.status();
    tokio::spawn(auction.run());

    let (read_half, writer) = tokio::io::split(client_io);
    let lines = BufReader::new(read_half).lines();
    (Bidder { lines, writer }, status)
}

#[tokio::test]
async fn messages_dispatch_in_fifo_order() {
    init_tracing();

    let (mut bidder, status) = spawn_auction(1, 1);

    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    for (name, bid) in [("alice", 10), ("bob", 20), ("carol", 30)] {
        bidder
            .send(&format!("bid bidder={name} bid={bid} sessionId=1 auctionId=1"))
            .await;
    }

    // Each strictly-greater bid produces one status, in mailbox order.
    for (name, bid) in [("alice", "10"), ("bob", "20"), ("carol", "30")] {
        let (msg_type, args) = bidder.recv().await;
        assert_eq!(msg_type, "status");
        assert_eq!(args["bidder"], name);
        assert_eq!(args["bid"], bid);
    }

    assert_eq!(status.state(), TaskState::Running);
}

#[tokio::test]
async fn messages_for_other_sessions_or_auctions_are_dropped() {
    init_tracing();

    let (mut bidder, _status) = spawn_auction(1, 1);
    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    // Wrong session, wrong auction: both silently dropped with no side
    // effects on the high bid.
    bidder
        .send("bid bidder=eve bid=100 sessionId=2 auctionId=1")
        .await;
    bidder
        .send("bid bidder=eve bid=100 sessionId=1 auctionId=9")
        .await;
    bidder
        .send("bid bidder=alice bid=5 sessionId=1 auctionId=1")
        .await;

    // Had either of eve's bids been handled, alice's 5 would have been a
    // low bid and produced nothing.
    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "status");
    assert_eq!(args["bidder"], "alice");
    assert_eq!(args["bid"], "5");
}

#[tokio::test]
async fn messages_without_routing_keys_are_dropped() {
    init_tracing();

    let (mut bidder, _status) = spawn_auction(1, 1);
    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    bidder.send("bid bidder=eve bid=100").await;
    bidder.send("bid bidder=eve bid=100 sessionId=1").await;
    bidder.send("bid bidder=alice bid=5 sessionId=1 auctionId=1").await;

    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "status");
    assert_eq!(args["bidder"], "alice");
}

#[tokio::test]
async fn unknown_message_types_are_dropped() {
    init_tracing();

    let (mut bidder, status) = spawn_auction(1, 1);
    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    bidder.send("frobnicate sessionId=1 auctionId=1").await;
    bidder.send("bid bidder=alice bid=5 sessionId=1 auctionId=1").await;

    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "status");
    assert_eq!(args["bidder"], "alice");
    assert_eq!(status.state(), TaskState::Running);
}

#[tokio::test]
async fn handler_argument_errors_do_not_kill_the_loop() {
    init_tracing();

    let (mut bidder, status) = spawn_auction(1, 1);
    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    // Missing bidder/bid keys and an unparseable amount: logged, dropped,
    // loop keeps running.
    bidder.send("bid sessionId=1 auctionId=1").await;
    bidder.send("bid bidder=eve sessionId=1 auctionId=1").await;
    bidder
        .send("bid bidder=eve bid=lots sessionId=1 auctionId=1")
        .await;
    bidder.send("bid bidder=alice bid=5 sessionId=1 auctionId=1").await;

    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "status");
    assert_eq!(args["bidder"], "alice");
    assert_eq!(status.state(), TaskState::Running);
}

#[tokio::test]
async fn malformed_tokens_are_ignored_within_a_message() {
    init_tracing();

    let (mut bidder, _status) = spawn_auction(1, 1);
    let (msg_type, _) = bidder.recv().await;
    assert_eq!(msg_type, "start");

    bidder
        .send("bid junk a=b=c bidder=alice bid=7 sessionId=1 auctionId=1")
        .await;

    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "status");
    assert_eq!(args["bidder"], "alice");
    assert_eq!(args["bid"], "7");
}

#[tokio::test]
async fn outbound_messages_carry_routing_keys() {
    init_tracing();

    let (mut bidder, _status) = spawn_auction(4, 2);

    let (msg_type, args) = bidder.recv().await;
    assert_eq!(msg_type, "start");
    assert_eq!(args["sessionId"], "2");
    assert_eq!(args["auctionId"], "4");
    assert!(args.contains_key("timer"));
}

#[tokio::test]
async fn single_shot_run_refuses_non_new_tasks() {
    init_tracing();

    let (server_io, _client_io) = tokio::io::duplex(4096);
    let session = ClientSession::spawn(server_io, fake_addr());

    let mut auction = Auction::new(1, 1, Params::new(), AscendingAuction::new());
    auction.set_clients(vec![session]);
    auction.set_resolve_grace(Duration::ZERO);

    // Drive the task out of New before running: run() must return without
    // touching anything.
    let status = auction.status();
    assert!(status.start());
    with_timeout(auction.run()).await;
    assert_eq!(status.state(), TaskState::Running);
}
