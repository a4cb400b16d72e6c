//! Input resolution against a local HTTP server.

use edgequake_intake::pipeline::input::resolve_input;
use edgequake_intake::{prepare_file, IntakeConfig, IntakeError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_HEADER: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'];

async fn serve(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn content_type_header_wins() {
    let server = serve(
        "/docs/front",
        ResponseTemplate::new(200).set_body_raw(JPEG_HEADER.to_vec(), "image/webp"),
    )
    .await;

    let file = resolve_input(&format!("{}/docs/front", server.uri()), &IntakeConfig::default())
        .await
        .unwrap();

    assert_eq!(file.name, "front");
    assert_eq!(file.mime_type, "image/webp");
    assert_eq!(&*file.data, &JPEG_HEADER);
}

#[tokio::test]
async fn octet_stream_falls_back_to_sniffing() {
    let server = serve(
        "/scan.bin",
        ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7\n%body".to_vec()),
    )
    .await;

    let file = resolve_input(&format!("{}/scan.bin", server.uri()), &IntakeConfig::default())
        .await
        .unwrap();

    assert_eq!(file.mime_type, "application/pdf");
    assert!(file.is_pdf());
}

#[tokio::test]
async fn http_error_is_a_download_failure() {
    let server = serve("/gone.jpg", ResponseTemplate::new(404)).await;

    let err = resolve_input(&format!("{}/gone.jpg", server.uri()), &IntakeConfig::default())
        .await
        .unwrap_err();

    match err {
        IntakeError::DownloadFailed { reason, .. } => assert!(reason.contains("404")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_download_is_refused() {
    let server = serve(
        "/huge.jpg",
        ResponseTemplate::new(200).set_body_raw(vec![0xFF; 64], "image/jpeg"),
    )
    .await;
    let config = IntakeConfig::builder().max_file_bytes(16).build().unwrap();

    let err = resolve_input(&format!("{}/huge.jpg", server.uri()), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::FileTooLarge { limit: 16, .. }));
}

#[tokio::test]
async fn non_document_types_are_refused() {
    let server = serve(
        "/notes.txt",
        ResponseTemplate::new(200).set_body_raw(b"hello".to_vec(), "text/plain"),
    )
    .await;

    let err = resolve_input(&format!("{}/notes.txt", server.uri()), &IntakeConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::UnsupportedType { ref mime_type, .. } if mime_type == "text/plain"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = serve(
        "/slow.jpg",
        ResponseTemplate::new(200)
            .set_body_raw(JPEG_HEADER.to_vec(), "image/jpeg")
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let config = IntakeConfig::builder().download_timeout_secs(1).build().unwrap();

    let err = resolve_input(&format!("{}/slow.jpg", server.uri()), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::DownloadTimeout { secs: 1, .. }));
}

#[tokio::test]
async fn prepared_pdf_is_flagged_multi_page() {
    let server = serve(
        "/registro.pdf",
        ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4\n%x".to_vec(), "application/pdf"),
    )
    .await;

    let (file, multi_page) = prepare_file(&format!("{}/registro.pdf", server.uri()), &IntakeConfig::default())
        .await
        .unwrap();

    assert!(multi_page);
    assert_eq!(file.name, "registro.pdf");
    assert_eq!(&*file.data, b"%PDF-1.4\n%x");
}
