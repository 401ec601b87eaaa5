//! End-to-end sends through each transport.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{closed_port, http_response, serve_http, serve_smtp};
use relaymail_core::config::{CloudConfig, RelayConfig};
use relaymail_core::{
    Attachment, CloudTransport, ConsoleSink, ConsoleTransport, Error, Hydrator, MailService,
    Message, NoopQuota, RelayTransport, Transport, TransportError, ValidationError,
};
use std::time::Duration;
use tokio::net::TcpListener;

fn basic_message() -> Message {
    Message {
        from: "a@b.com".into(),
        to: "c@d.com".into(),
        subject: "S".into(),
        html_body: "<p>hi</p>".into(),
        ..Message::default()
    }
}

fn service(transport: impl Into<Transport>) -> MailService<NoopQuota> {
    MailService::new(transport.into(), Hydrator::default(), NoopQuota)
}

fn cloud_config(endpoint: String) -> CloudConfig {
    CloudConfig {
        region: Some("us-east-1".into()),
        endpoint: Some(endpoint),
        access_key_id: Some("AKIDTEST".into()),
        secret_access_key: Some("secret".into()),
        session_token: None,
    }
}

#[tokio::test]
async fn dev_transport_renders_subject() {
    let (sink, buf) = ConsoleSink::buffer();
    service(ConsoleTransport::new(sink))
        .send("t1", basic_message())
        .await
        .unwrap();

    let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert!(out.contains("Subject: S"));
    assert!(out.contains("<p>hi</p>"));
}

#[tokio::test]
async fn relay_transport_fails_when_relay_is_down() {
    let relay = RelayTransport::new(RelayConfig {
        host: "127.0.0.1".into(),
        port: closed_port().await,
        ..RelayConfig::default()
    });

    let err = service(relay).send("t1", basic_message()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn relay_receives_hydrated_message() {
    let (base, _origin) = serve_http(vec![http_response(
        200,
        &[("Content-Type", "text/plain; charset=utf-8")],
        b"attached text",
    )])
    .await;
    let (port, relay) = serve_smtp().await;

    let message = Message {
        from: "noreply@acme.test".into(),
        from_name: "Acme".into(),
        to: "Jane <jane@example.com>".into(),
        subject: "Your receipt".into(),
        body: "<p>Thanks!</p>".into(),
        is_transactional: true,
        attachments: vec![Attachment::from_url(format!("{base}/notes.txt"))],
        ..Message::default()
    };

    let transport = RelayTransport::new(RelayConfig {
        host: "127.0.0.1".into(),
        port,
        timeout_secs: Some(10),
        ..RelayConfig::default()
    });
    service(transport).send("t1", message).await.unwrap();

    let transcript = relay.await.unwrap();
    assert!(transcript.contains("EHLO localhost\r\n"));
    assert!(transcript.contains("MAIL FROM:<noreply@acme.test> BODY=8BITMIME SIZE="));
    assert!(transcript.contains("RCPT TO:<jane@example.com>\r\n"));
    assert!(transcript.contains("From: Acme <noreply@acme.test>\r\n"));
    assert!(transcript.contains("To: jane@example.com\r\n"));
    assert!(transcript.contains("X-Transactional: true\r\nPrecedence: bulk\r\n"));
    assert!(transcript.contains("\r\nThanks!\r\n"));
    assert!(transcript.contains("Content-Disposition: attachment; filename=\"notes.txt\"\r\n"));
    assert!(transcript.contains(&STANDARD.encode("attached text")));
    assert!(transcript.ends_with(".\r\nQUIT\r\n"));
}

#[tokio::test]
async fn silent_relay_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _hold = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let relay = RelayTransport::new(RelayConfig {
        host: "127.0.0.1".into(),
        port,
        timeout_secs: Some(1),
        ..RelayConfig::default()
    });
    let err = service(relay).send("t1", basic_message()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Timeout(1))));
}

#[tokio::test]
async fn cloud_transport_posts_signed_raw_message() {
    let (base, api) = serve_http(vec![http_response(
        200,
        &[("Content-Type", "application/json")],
        br#"{"MessageId":"0100018f-test"}"#,
    )])
    .await;

    let message = Message {
        reply_to: String::new(),
        ..basic_message()
    };
    let cloud = CloudTransport::new(cloud_config(base.clone()));
    service(cloud).send("t1", message).await.unwrap();

    let requests = api.await.unwrap();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v2/email/outbound-emails");
    assert_eq!(
        request.header("host"),
        Some(base.trim_start_matches("http://"))
    );
    let auth = request.header("authorization").unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDTEST/"));
    assert!(auth.contains("/us-east-1/ses/aws4_request"));

    let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let raw = STANDARD
        .decode(payload["Content"]["Raw"]["Data"].as_str().unwrap())
        .unwrap();
    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.contains("Subject: S\r\n"));
    assert!(raw.contains("Reply-To: a@b.com\r\n"));
    assert!(raw.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
}

#[tokio::test]
async fn cloud_rejection_carries_status_and_message() {
    let (base, _api) = serve_http(vec![http_response(
        400,
        &[
            ("Content-Type", "application/json"),
            ("x-amzn-ErrorType", "MessageRejected"),
        ],
        br#"{"message":"Email address is not verified."}"#,
    )])
    .await;

    let cloud = CloudTransport::new(cloud_config(base));
    let err = service(cloud).send("t1", basic_message()).await.unwrap_err();
    match err {
        Error::Transport(TransportError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Email address is not verified.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cloud_rejects_empty_sender_without_calling_api() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let message = Message {
        from: String::new(),
        ..basic_message()
    };
    let cloud = CloudTransport::new(cloud_config(base));
    let err = service(cloud).send("t1", message).await.unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::InvalidFrom)));

    let connection = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(connection.is_err(), "API was contacted");
}

#[tokio::test]
async fn cloud_unreachable_endpoint_is_transport_error() {
    let port = closed_port().await;
    let cloud = CloudTransport::new(cloud_config(format!("http://127.0.0.1:{port}")));
    let err = service(cloud).send("t1", basic_message()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Unreachable(_))));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn missing_recipient_fails_before_network() {
    let port = closed_port().await;
    let relay = RelayTransport::new(RelayConfig {
        host: "127.0.0.1".into(),
        port,
        ..RelayConfig::default()
    });
    let message = Message {
        to: String::new(),
        ..basic_message()
    };
    let err = service(relay).send("t1", message).await.unwrap_err();
    assert!(err.is_client_error());
}
