//! End-to-end scenarios over real TCP connections.


use std::time::Duration;

use serde_json::json;
use test_harness::{TestBroker, TestPeer};

const RECV: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_happy_path_submit_bid_succeed() {
    let broker = TestBroker::start(7301, 10_000).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    let mut worker = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(2).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 42}))
        .await;

    let ack = submitter.recv(RECV).await;
    assert_eq!(ack["type"], "SUBMIT_ACK");
    assert_eq!(ack["clientId"], "c1");
    let job_id = ack["id"].as_str().unwrap().to_string();

    let announced = worker.recv(RECV).await;
    assert_eq!(announced["type"], "SUBMIT");
    assert_eq!(announced["id"], job_id.as_str());
    assert_eq!(announced["topic"], "t");
    assert_eq!(announced["payload"], 42);

    worker.send(json!({"type": "BID", "id": job_id})).await;
    let reply = worker.recv(RECV).await;
    assert_eq!(reply["type"], "BID_ACK");
    assert_eq!(reply["id"], job_id.as_str());

    // The submitter must see the worker's result byte for byte
    let result_line = format!(r#"{{"type":"JOB_SUCCESS","id":"{}","value":"ok"}}"#, job_id);
    worker.send_raw(&result_line).await;
    assert_eq!(submitter.recv_raw(RECV).await, result_line);
}

#[tokio::test]
async fn test_losing_bidder_is_rejected() {
    let broker = TestBroker::start(7311, 10_000).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    let mut winner = TestPeer::connect(broker.addr).await;
    let mut loser = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(3).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": null}))
        .await;
    let job_id = submitter.recv(RECV).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    assert_eq!(winner.recv(RECV).await["type"], "SUBMIT");
    assert_eq!(loser.recv(RECV).await["type"], "SUBMIT");

    winner.send(json!({"type": "BID", "id": job_id})).await;
    assert_eq!(winner.recv(RECV).await["type"], "BID_ACK");

    loser.send(json!({"type": "BID", "id": job_id})).await;
    assert_eq!(loser.recv(RECV).await["type"], "BID_REJECT");

    winner
        .send(json!({"type": "JOB_SUCCESS", "id": job_id, "value": "done"}))
        .await;
    let result = submitter.recv(RECV).await;
    assert_eq!(result["type"], "JOB_SUCCESS");
    assert_eq!(result["value"], "done");

    // The loser hears nothing further about the job
    loser.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_cancel_before_bid() {
    let broker = TestBroker::start(7321, 10_000).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    let mut worker = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(2).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 1}))
        .await;
    let job_id = submitter.recv(RECV).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(worker.recv(RECV).await["type"], "SUBMIT");

    submitter.send(json!({"type": "CANCEL", "id": job_id})).await;
    let failure = submitter.recv(RECV).await;
    assert_eq!(failure["type"], "JOB_FAILURE");
    assert_eq!(failure["id"], job_id.as_str());
    assert_eq!(failure["reason"], "Client cancel");

    // A bid against the cancelled job gets no reply at all
    worker.send(json!({"type": "BID", "id": job_id})).await;
    worker.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_queue_timeout_fails_unclaimed_job() {
    let broker = TestBroker::start(7331, 300).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(1).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 1}))
        .await;
    let job_id = submitter.recv(RECV).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let failure = submitter.recv(RECV).await;
    assert_eq!(failure["type"], "JOB_FAILURE");
    assert_eq!(failure["id"], job_id.as_str());
    assert_eq!(failure["reason"], "Queue timeout");

    // Exactly one terminal frame
    submitter.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_bid_with_unknown_id_is_ignored() {
    let broker = TestBroker::start(7341, 10_000).await;
    let mut worker = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(1).await;

    worker.send(json!({"type": "BID", "id": "bogus"})).await;
    worker.expect_silence(QUIET).await;

    // The broker is unaffected and still brokers jobs
    let mut submitter = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(2).await;
    submitter
        .send(json!({"type": "SUBMIT", "id": "c9", "topic": "t", "payload": 1}))
        .await;
    assert_eq!(submitter.recv(RECV).await["type"], "SUBMIT_ACK");
}

#[tokio::test]
async fn test_submitter_disconnect_does_not_disturb_others() {
    let broker = TestBroker::start(7351, 10_000).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    let mut worker = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(2).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 1}))
        .await;
    let job_id = submitter.recv(RECV).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(worker.recv(RECV).await["type"], "SUBMIT");

    // Submitter goes away after the ack
    drop(submitter);
    broker.wait_for_peers(1).await;

    worker.send(json!({"type": "BID", "id": job_id})).await;
    assert_eq!(worker.recv(RECV).await["type"], "BID_ACK");

    // The forward to the dead submitter is silently skipped
    worker
        .send(json!({"type": "JOB_SUCCESS", "id": job_id, "value": "ok"}))
        .await;
    worker.expect_silence(QUIET).await;

    // The broker keeps running for everyone else
    let mut other = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(2).await;
    other
        .send(json!({"type": "SUBMIT", "id": "c2", "topic": "t", "payload": 2}))
        .await;
    assert_eq!(other.recv(RECV).await["type"], "SUBMIT_ACK");
}

#[tokio::test]
async fn test_each_other_peer_sees_the_submission_exactly_once() {
    let broker = TestBroker::start(7361, 10_000).await;
    let mut submitter = TestPeer::connect(broker.addr).await;
    let mut worker_a = TestPeer::connect(broker.addr).await;
    let mut worker_b = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(3).await;

    submitter
        .send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 1}))
        .await;
    let job_id = submitter.recv(RECV).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    for worker in [&mut worker_a, &mut worker_b] {
        let announced = worker.recv(RECV).await;
        assert_eq!(announced["type"], "SUBMIT");
        assert_eq!(announced["id"], job_id.as_str());
        worker.expect_silence(QUIET).await;
    }

    // The submitter never sees its own re-emission
    submitter.expect_silence(QUIET).await;
}

#[tokio::test]
async fn test_malformed_lines_are_dropped_and_connection_survives() {
    let broker = TestBroker::start(7371, 10_000).await;
    let mut peer = TestPeer::connect(broker.addr).await;
    broker.wait_for_peers(1).await;

    peer.send_raw("this is not json").await;
    peer.send(json!({"type": "MYSTERY", "id": "x"})).await;
    peer.expect_silence(QUIET).await;

    // The same connection still works afterwards
    peer.send(json!({"type": "SUBMIT", "id": "c1", "topic": "t", "payload": 1}))
        .await;
    assert_eq!(peer.recv(RECV).await["type"], "SUBMIT_ACK");
}
