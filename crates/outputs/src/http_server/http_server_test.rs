//! HTTP server output tests

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use conduit_component::State;
use conduit_message::{
    AckReceiver, Batch, DeliveryError, Transaction, TransactionTx, transaction_channel,
};
use conduit_metrics::{LocalRegistry, noop};
use futures_util::StreamExt;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use super::*;

const ACK_TIMEOUT: Duration = Duration::from_secs(1);

fn started(config: HttpServerConfig) -> (HttpServerOutput, TransactionTx) {
    let mut output = HttpServerOutput::new(config, noop().as_ref()).unwrap();
    let (tx, rx) = transaction_channel();
    output.consume(rx).unwrap();
    (output, tx)
}

async fn send(tx: &TransactionTx, batch: Batch) -> AckReceiver {
    let (transaction, ack) = Transaction::pending(batch);
    tx.send(transaction).await.unwrap();
    ack
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Serve the output's routes on a local listener, returning the websocket url
async fn serve_locally(output: &HttpServerOutput) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let router = output.router();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("ws://{address}/get/ws")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

// =============================================================================
// Construction
// =============================================================================

#[tokio::test]
async fn test_requires_a_verb() {
    let config = HttpServerConfig {
        allowed_verbs: Vec::new(),
        ..HttpServerConfig::default()
    };
    let err = HttpServerOutput::new(config, noop().as_ref()).err().unwrap();
    assert!(matches!(err, ComponentError::InvalidConfig(ref m) if m.contains("verb")));
}

#[tokio::test]
async fn test_rejects_invalid_verb() {
    let config = HttpServerConfig {
        allowed_verbs: vec!["NOT A VERB".into()],
        ..HttpServerConfig::default()
    };
    assert!(HttpServerOutput::new(config, noop().as_ref()).is_err());
}

#[tokio::test]
async fn test_consume_twice() {
    let (mut output, _tx) = started(HttpServerConfig::default());
    let (_tx2, rx2) = transaction_channel();
    assert!(matches!(
        output.consume(rx2),
        Err(ComponentError::AlreadyStarted)
    ));
    assert!(output.connected());
}

// =============================================================================
// Single-shot endpoint
// =============================================================================

#[tokio::test]
async fn test_get_single_part() {
    let (output, tx) = started(HttpServerConfig::default());
    let ack = send(&tx, Batch::quick(["hello world"])).await;

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(response).await, b"hello world");
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_get_multi_part() {
    let (output, tx) = started(HttpServerConfig::default());
    let ack = send(&tx, Batch::quick(["first", "second"])).await;

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body.matches(&format!("--{boundary}\r\n")).count(), 2);
    assert!(body.contains("\r\n\r\nfirst\r\n"));
    assert!(body.contains("\r\n\r\nsecond\r\n"));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_get_verb_not_allowed() {
    let (output, tx) = started(HttpServerConfig::default());
    let mut ack = send(&tx, Batch::quick(["kept"])).await;

    let response = output.router().oneshot(request("POST", "/get")).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(ack.try_recv().is_none(), "nothing consumed");
}

#[tokio::test]
async fn test_get_custom_verbs() {
    let config = HttpServerConfig {
        allowed_verbs: vec!["POST".into()],
        ..HttpServerConfig::default()
    };
    let (output, tx) = started(config);
    let ack = send(&tx, Batch::quick(["posted"])).await;

    let response = output.router().oneshot(request("POST", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_get_timeout_consumes_nothing() {
    let config = HttpServerConfig::default().with_timeout(Duration::from_millis(100));
    let (output, tx) = started(config);

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body_bytes(response).await, b"timed out waiting for message");

    // Sent after the deadline: must still be waiting for the next client
    let mut ack = send(&tx, Batch::quick(["late"])).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ack.try_recv().is_none());

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"late");
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_get_after_close() {
    let (output, _tx) = started(HttpServerConfig::default());
    output.close_async();

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(response).await, b"server closed");
}

#[tokio::test]
async fn test_get_upstream_closed_closes_output() {
    let (output, tx) = started(HttpServerConfig::default());
    drop(tx);

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
    assert_eq!(output.state.lifecycle.state(), State::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_distinct_transactions() {
    let (output, tx) = started(HttpServerConfig::default());

    let mut requests = Vec::new();
    for _ in 0..4 {
        let router = output.router();
        requests.push(tokio::spawn(async move {
            let response = router.oneshot(request("GET", "/get")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            String::from_utf8(body_bytes(response).await).unwrap()
        }));
    }

    let mut acks = Vec::new();
    for i in 0..4 {
        acks.push(send(&tx, Batch::quick([format!("msg {i}")])).await);
    }

    let mut bodies = Vec::new();
    for request in requests {
        bodies.push(request.await.unwrap());
    }
    bodies.sort();
    assert_eq!(bodies, vec!["msg 0", "msg 1", "msg 2", "msg 3"]);

    for ack in acks {
        assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
    }
}

// =============================================================================
// Stream endpoint
// =============================================================================

#[tokio::test]
async fn test_stream_until_upstream_closes() {
    let (output, tx) = started(HttpServerConfig::default());

    let response = output
        .router()
        .oneshot(request("GET", "/get/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let producer = tokio::spawn(async move {
        let first = send(&tx, Batch::quick(["a"])).await;
        let second = send(&tx, Batch::quick(["b", "c"])).await;
        (first, second)
    });

    let body = timeout(ACK_TIMEOUT, body_bytes(response)).await.unwrap();
    assert_eq!(body, b"a\nb\nc\n\n");

    let (first, second) = producer.await.unwrap();
    assert_eq!(first.await, Ok(()));
    assert_eq!(second.await, Ok(()));

    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn test_stream_verb_not_allowed() {
    let (output, _tx) = started(HttpServerConfig::default());
    let response = output
        .router()
        .oneshot(request("DELETE", "/get/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_stream_ends_on_close() {
    let (output, _tx) = started(HttpServerConfig::default());
    let response = output
        .router()
        .oneshot(request("GET", "/get/stream"))
        .await
        .unwrap();

    output.close_async();
    let body = timeout(ACK_TIMEOUT, body_bytes(response)).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_stream_unread_chunk_is_not_acked() {
    let (output, tx) = started(HttpServerConfig::default());
    let response = output
        .router()
        .oneshot(request("GET", "/get/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut ack = send(&tx, Batch::quick(["unread"])).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ack.try_recv().is_none(), "body never polled");

    drop(response);
    assert!(matches!(
        timeout(ACK_TIMEOUT, ack).await.unwrap(),
        Err(DeliveryError::Write(_))
    ));
}

#[tokio::test]
async fn test_stream_acks_once_chunk_taken() {
    let (output, tx) = started(HttpServerConfig::default());
    let response = output
        .router()
        .oneshot(request("GET", "/get/stream"))
        .await
        .unwrap();

    let mut ack = send(&tx, Batch::quick(["read"])).await;
    let mut body = response.into_body().into_data_stream();
    let chunk = timeout(ACK_TIMEOUT, body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(&chunk[..], b"read\n");

    // Yielded but not yet handed on
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ack.try_recv().is_none());

    // Asking for the next chunk hands the first one on
    let pending = timeout(Duration::from_millis(50), body.next()).await;
    assert!(pending.is_err(), "no second chunk");
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
}

// =============================================================================
// Websocket endpoint
// =============================================================================

#[tokio::test]
async fn test_websocket_frame_per_part() {
    let (output, tx) = started(HttpServerConfig::default());
    let url = serve_locally(&output).await;
    let (mut client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    let ack = send(&tx, Batch::quick(["first", "second"])).await;

    let first = timeout(ACK_TIMEOUT, client.next()).await.unwrap().unwrap().unwrap();
    let second = timeout(ACK_TIMEOUT, client.next()).await.unwrap().unwrap().unwrap();
    assert!(first.is_binary());
    assert!(second.is_binary());
    assert_eq!(&first.into_data()[..], b"first");
    assert_eq!(&second.into_data()[..], b"second");

    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_websocket_transactions_in_order() {
    let registry = LocalRegistry::new();
    let mut output = HttpServerOutput::new(HttpServerConfig::default(), &registry).unwrap();
    let (tx, rx) = transaction_channel();
    output.consume(rx).unwrap();
    let url = serve_locally(&output).await;
    let (mut client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    for text in ["one", "two", "three"] {
        let ack = send(&tx, Batch::quick([text])).await;
        let frame = timeout(ACK_TIMEOUT, client.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(&frame.into_data()[..], text.as_bytes());
        assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
    }

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.counter("output_batch_sent", &[("endpoint", "websocket")]),
        Some(3)
    );
}

#[tokio::test]
async fn test_websocket_client_close_stops_pulling() {
    let (output, tx) = started(HttpServerConfig::default());
    let url = serve_locally(&output).await;
    let (mut client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    client.close(None).await.unwrap();
    while let Ok(Some(Ok(_))) = timeout(ACK_TIMEOUT, client.next()).await {}
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Left for the next client
    let mut ack = send(&tx, Batch::quick(["after close"])).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ack.try_recv().is_none());

    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(body_bytes(response).await, b"after close");
    assert_eq!(timeout(ACK_TIMEOUT, ack).await.unwrap(), Ok(()));
    assert!(!output.state.lifecycle.is_closing());
}

#[tokio::test]
async fn test_websocket_upstream_closed_closes_output() {
    let (output, tx) = started(HttpServerConfig::default());
    let url = serve_locally(&output).await;
    let (mut client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    drop(tx);

    let frame = timeout(ACK_TIMEOUT, client.next()).await.unwrap().unwrap().unwrap();
    assert!(matches!(frame, Message::Close(_)));
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
    assert_eq!(output.state.lifecycle.state(), State::Closed);
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_double_close() {
    let (output, _tx) = started(HttpServerConfig::default());
    output.close_async();
    output.close_async();
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
    output.close_async();
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn test_close_before_consume() {
    let mut output = HttpServerOutput::new(HttpServerConfig::default(), noop().as_ref()).unwrap();
    output.close_async();
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();

    let (_tx, rx) = transaction_channel();
    assert!(matches!(output.consume(rx), Err(ComponentError::Closed)));
}

#[tokio::test]
async fn test_close_rejects_buffered_transaction() {
    let (output, tx) = started(HttpServerConfig::default());
    let ack = send(&tx, Batch::quick(["never served"])).await;

    output.close_async();
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
    assert_eq!(
        timeout(ACK_TIMEOUT, ack).await.unwrap(),
        Err(DeliveryError::ShuttingDown)
    );
}

#[tokio::test]
async fn test_serves_on_own_address() {
    let (output, _tx) = started(HttpServerConfig::with_address("127.0.0.1:0"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!output.state.lifecycle.is_closing());

    output.close_async();
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn test_bind_failure_closes_output() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let (output, _tx) = started(HttpServerConfig::with_address(address));
    output.wait_for_close(ACK_TIMEOUT).await.unwrap();
    assert!(output.state.lifecycle.is_closing());
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_per_endpoint() {
    let registry = LocalRegistry::new();
    let mut output = HttpServerOutput::new(HttpServerConfig::default(), &registry).unwrap();
    let (tx, rx) = transaction_channel();
    output.consume(rx).unwrap();

    let part = conduit_message::Part::new("archived").with_metadata("batch_size", "3");
    let ack = send(&tx, Batch::new(vec![part])).await;
    let response = output.router().oneshot(request("GET", "/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    ack.await.unwrap();

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.counter("output_sent", &[("endpoint", "get")]), Some(3));
    assert_eq!(
        snapshot.counter("output_batch_sent", &[("endpoint", "get")]),
        Some(1)
    );
    assert_eq!(
        snapshot.counter("output_sent", &[("endpoint", "stream")]),
        Some(0)
    );
    assert_eq!(
        snapshot
            .timer("output_latency_ns", &[("endpoint", "get")])
            .map(|t| t.count),
        Some(1)
    );
}
