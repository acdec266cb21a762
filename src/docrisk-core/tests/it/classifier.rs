//! HTTP classifier against a local single-shot inference endpoint.

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use docrisk_core::classifier::{HttpClassifier, Label, PhishingClassifier};
use docrisk_core::config::ClassifierConfig;
use docrisk_core::AssessError;

/// What the endpoint received.
struct Received {
    head: String,
    body: Value,
}

/// Accept one request, answer with `status` and `body`, return the request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/classify", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        let (head, body_start) = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&raw[..pos]).into_owned(), pos + 4);
            }
        };
        let length: usize = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while raw.len() < body_start + length {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before body");
            raw.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        Received {
            head,
            body: serde_json::from_slice(&raw[body_start..body_start + length]).unwrap(),
        }
    });

    (url, handle)
}

fn classifier(url: String, token: Option<&str>) -> HttpClassifier {
    HttpClassifier::new(&ClassifierConfig {
        endpoint: Some(url),
        auth_token: token.map(String::from),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn posts_chunk_with_bearer_token() {
    let (url, server) = serve_once(
        "200 OK",
        r#"[[{"label":"phishing","score":0.93},{"label":"benign","score":0.07}]]"#,
    )
    .await;

    let result = classifier(url, Some("s3cret"))
        .classify("Send your OTP to claim the refund")
        .await
        .unwrap();

    assert_eq!(result.label, Label::Phishing);
    assert_eq!(result.confidence, 0.93);

    let received = server.await.unwrap();
    assert!(received.head.starts_with("POST /classify HTTP/1.1"));
    let head = received.head.to_ascii_lowercase();
    assert!(head.contains("authorization: bearer s3cret"));
    assert!(head.contains("content-type: application/json"));
    assert_eq!(
        received.body,
        json!({
            "inputs": "Send your OTP to claim the refund",
            "parameters": {"truncation": true}
        })
    );
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let (url, server) = serve_once("200 OK", r#"[{"label":"benign","score":0.8}]"#).await;

    let result = classifier(url, None).classify("Annual report").await.unwrap();

    assert_eq!(result.label, Label::NotPhishing);
    let received = server.await.unwrap();
    assert!(!received.head.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn non_success_status_is_classification_error() {
    let (url, server) =
        serve_once("503 Service Unavailable", r#"{"error":"model loading"}"#).await;

    let err = classifier(url, None).classify("text").await.unwrap_err();

    assert!(matches!(err, AssessError::Classification { .. }));
    assert!(err.is_degradable());
    assert!(err.to_string().contains("503"));
    server.await.unwrap();
}

#[tokio::test]
async fn empty_label_list_is_classification_error() {
    let (url, server) = serve_once("200 OK", "[]").await;

    let err = classifier(url, None).classify("text").await.unwrap_err();

    assert!(err.to_string().contains("no labels"));
    server.await.unwrap();
}
