//! Attachment hydration against an in-process HTTP origin.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{closed_port, http_response, serve_http};
use relaymail_core::{Attachment, Error, FetchError, Hydrator};

#[tokio::test]
async fn fills_body_type_and_name_from_url() {
    let (base, origin) = serve_http(vec![http_response(
        200,
        &[("Content-Type", "application/pdf; charset=binary")],
        b"%PDF-1.7",
    )])
    .await;

    let mut attachments = vec![Attachment::from_url(format!(
        "{base}/files/report.pdf?token=abc#page=1"
    ))];
    Hydrator::default().hydrate(&mut attachments).await.unwrap();

    assert_eq!(attachments[0].body, b"%PDF-1.7");
    assert_eq!(attachments[0].content_type, "application/pdf");
    assert_eq!(attachments[0].filename, "report.pdf");

    let requests = origin.await.unwrap();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/files/report.pdf?token=abc");
}

#[tokio::test]
async fn prefers_content_disposition_name() {
    let (base, _origin) = serve_http(vec![http_response(
        200,
        &[
            ("Content-Type", "text/csv"),
            ("Content-Disposition", "attachment; filename=\"q3 numbers.csv\"; size=3"),
        ],
        b"a,b",
    )])
    .await;

    let mut attachments = vec![Attachment::from_url(format!("{base}/download/42"))];
    Hydrator::default().hydrate(&mut attachments).await.unwrap();
    assert_eq!(attachments[0].filename, "q3 numbers.csv");
}

#[tokio::test]
async fn keeps_caller_fields_and_falls_back_to_placeholder() {
    let (base, origin) = serve_http(vec![
        http_response(200, &[("Content-Type", "image/png")], b"\x89PNG"),
        http_response(200, &[], b"raw"),
    ])
    .await;

    let mut attachments = vec![
        Attachment {
            content_type: "image/x-custom".into(),
            filename: "logo.png".into(),
            ..Attachment::from_url(format!("{base}/a/"))
        },
        Attachment::from_url(format!("{base}/")),
    ];
    Hydrator::new(None).unwrap().hydrate(&mut attachments).await.unwrap();

    assert_eq!(attachments[0].content_type, "image/x-custom");
    assert_eq!(attachments[0].filename, "logo.png");
    assert_eq!(attachments[0].body, b"\x89PNG");

    assert_eq!(attachments[1].content_type, "");
    assert_eq!(attachments[1].filename, "attachment_2");
    assert_eq!(origin.await.unwrap().len(), 2);
}

#[tokio::test]
async fn non_200_status_names_url_and_status() {
    let (base, _origin) = serve_http(vec![http_response(404, &[], b"missing")]).await;
    let url = format!("{base}/gone.pdf");

    let mut attachments = vec![Attachment::from_url(url.clone())];
    let err = Hydrator::default().hydrate(&mut attachments).await.unwrap_err();

    match err {
        Error::Fetch(FetchError::Status { url: failed, status }) => {
            assert_eq!(failed, url);
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(attachments[0].body.is_empty());
}

#[tokio::test]
async fn unreachable_origin_is_request_error() {
    let port = closed_port().await;
    let mut attachments = vec![Attachment::from_url(format!("http://127.0.0.1:{port}/x"))];
    let err = Hydrator::default().hydrate(&mut attachments).await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Request { .. })));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn first_failure_stops_the_pass() {
    let (base, origin) = serve_http(vec![http_response(500, &[], b"")]).await;
    let mut attachments = vec![
        Attachment::from_url(format!("{base}/one")),
        Attachment::from_url(format!("{base}/two")),
    ];
    let err = Hydrator::default().hydrate(&mut attachments).await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Status { status: 500, .. })));
    assert!(attachments[1].body.is_empty());
    assert_eq!(origin.await.unwrap().len(), 1);
}
