mod common;

use bytes::Bytes;
use common::{Script, ScriptedTransport};
use lgview_model::CommandRequest;
use lgview_stream::{send, FailureKind, StreamOutcome, TransportError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const URL: &str = "http://h1/lookingglass/ping";

async fn collect(transport: &ScriptedTransport, cancel: &CancellationToken) -> (StreamOutcome, Vec<String>) {
    let mut chunks = Vec::new();
    let outcome = send(
        transport,
        URL,
        &CommandRequest::new("1.1.1.1"),
        cancel,
        |chunk| chunks.push(chunk),
    )
    .await;
    (outcome, chunks)
}

#[tokio::test]
async fn chunks_arrive_in_order_and_concatenate_to_the_body() {
    let transport = ScriptedTransport::new();
    transport.push_chunks(&["a", "b", "c"]);

    let (outcome, chunks) = collect(&transport, &CancellationToken::new()).await;

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(chunks, vec!["a", "b", "c"]);
    assert_eq!(chunks.concat(), "abc");
}

#[tokio::test]
async fn multibyte_characters_split_across_reads_decode_whole() {
    let transport = ScriptedTransport::new();
    transport.push(Script::Body(vec![
        Ok(Bytes::from_static(b"1  r\xC3")),
        Ok(Bytes::from_static(b"\xA9seau \xE2")),
        Ok(Bytes::from_static(b"\x86")),
        Ok(Bytes::from_static(b"\x92 2.0 ms\n")),
    ]));

    let (outcome, chunks) = collect(&transport, &CancellationToken::new()).await;

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(chunks, vec!["1  r", "\u{e9}seau ", "\u{2192} 2.0 ms\n"]);
}

#[tokio::test]
async fn failure_to_open_is_reported_without_chunks() {
    let transport = ScriptedTransport::new();
    transport.push(Script::Refuse(TransportError::Connection(
        "connection refused".to_string(),
    )));

    let (outcome, chunks) = collect(&transport, &CancellationToken::new()).await;

    match outcome {
        StreamOutcome::Failed(err) => assert_eq!(err.kind(), FailureKind::Connection),
        other => panic!("expected a failure, got {other:?}"),
    }
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn pre_cancelled_token_skips_the_request() {
    let transport = ScriptedTransport::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (outcome, chunks) = collect(&transport, &cancel).await;

    assert_eq!(outcome, StreamOutcome::Cancelled);
    assert!(chunks.is_empty());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn cancel_mid_stream_stops_delivery() {
    let transport = ScriptedTransport::new();
    let feeder = transport.push_live();
    let cancel = CancellationToken::new();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
    let request = CommandRequest::new("1.1.1.1");

    let streaming = send(
        transport.as_ref(),
        URL,
        &request,
        &cancel,
        |chunk| {
            let _ = seen_tx.send(chunk);
        },
    );
    let driver = async {
        feeder.chunk("first");
        let first = seen_rx.recv().await;
        cancel.cancel();
        feeder.chunk("second");
        feeder.error("reset after cancel");
        first
    };

    let (outcome, first) = tokio::join!(streaming, driver);

    assert_eq!(outcome, StreamOutcome::Cancelled);
    assert_eq!(first.as_deref(), Some("first"));
    assert!(seen_rx.try_recv().is_err(), "nothing may follow the cancel");
}

#[tokio::test]
async fn read_error_after_chunks_is_a_failure() {
    let transport = ScriptedTransport::new();
    transport.push(Script::Body(vec![
        Ok(Bytes::from_static(b"PING 1.1.1.1\n")),
        Err(TransportError::Read("unexpected EOF".to_string())),
    ]));

    let (outcome, chunks) = collect(&transport, &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        StreamOutcome::Failed(TransportError::Read("unexpected EOF".to_string()))
    );
    assert_eq!(chunks, vec!["PING 1.1.1.1\n"]);
}

#[tokio::test]
async fn truncated_character_at_end_is_flushed() {
    let transport = ScriptedTransport::new();
    transport.push(Script::Body(vec![Ok(Bytes::from_static(b"done\xE2\x86"))]));

    let (outcome, chunks) = collect(&transport, &CancellationToken::new()).await;

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(chunks, vec!["done", "\u{FFFD}"]);
}
