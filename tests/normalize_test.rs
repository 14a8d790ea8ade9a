//! Normalization API integration tests.

mod common;

use common::{
    assert_container_structure, create_test_jpeg, create_test_png, data_url, decode_data_url,
    TestServer,
};
use reqwest::multipart;
use serde_json::{json, Value};

#[tokio::test]
async fn test_normalize_jpeg_data_url() {
    let server = TestServer::start().await;
    let client = server.client();

    let response = client
        .post(server.url("/api/normalize"))
        .json(&json!({ "image": data_url("image/jpeg", &create_test_jpeg(800, 600, 80)) }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let json: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["isValid"], true);
    assert_eq!(json["width"], 800);
    assert_eq!(json["height"], 600);
    assert_eq!(json["originalFormat"], "jpeg");
    assert!(json["sizeInMegabytes"].as_f64().unwrap() > 0.0);
    assert!(json.get("errorMessage").is_none());

    let payload = json["normalizedPayload"].as_str().unwrap();
    assert!(payload.starts_with("data:image/jpeg;base64,"));
    assert_container_structure(&decode_data_url(payload));
}

#[tokio::test]
async fn test_normalize_png_data_url() {
    let server = TestServer::start().await;
    let client = server.client();

    let response = client
        .post(server.url("/api/normalize"))
        .json(&json!({ "image": data_url("image/png", &create_test_png(800, 600)) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["isValid"], true);
    assert_eq!(json["originalFormat"], "png");
    assert_eq!(json["width"], 800);
    assert_eq!(json["height"], 600);
}

#[tokio::test]
async fn test_rejected_image_returns_422() {
    let server = TestServer::start().await;
    let client = server.client();

    let response = client
        .post(server.url("/api/normalize"))
        .json(&json!({ "image": "data:text/plain;base64,aGVsbG8=" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["isValid"], false);
    assert!(json["errorMessage"].as_str().unwrap().contains("text/plain"));
    assert!(json.get("normalizedPayload").is_none());
}

#[tokio::test]
async fn test_constraint_overrides() {
    let server = TestServer::start().await;
    let client = server.client();
    let image = data_url("image/jpeg", &create_test_jpeg(300, 300, 80));

    let response = client
        .post(server.url("/api/normalize"))
        .json(&json!({ "image": image }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["width"], 300);

    let response = client
        .post(server.url("/api/normalize"))
        .json(&json!({ "image": image, "constraints": { "minShortSide": 256 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = TestServer::start().await;
    let client = server.client();

    let response = client
        .post(server.url("/api/normalize"))
        .header("content-type", "application/json")
        .body("{\"picture\": 1}")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_ne!(response.status(), 422);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = TestServer::start().await;
    let client = server.client();

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(create_test_png(640, 512))
            .file_name("test.png")
            .mime_str("image/png")
            .unwrap(),
    );

    let response = client
        .post(server.url("/api/normalize/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["isValid"], true);
    assert_eq!(json["width"], 640);
    assert_eq!(json["height"], 512);
    assert_eq!(json["originalFormat"], "png");
}

#[tokio::test]
async fn test_multipart_sniffs_missing_content_type() {
    let server = TestServer::start().await;
    let client = server.client();

    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(create_test_jpeg(64, 64, 80)).file_name("photo"),
        )
        .text("constraints", r#"{"minShortSide": 32}"#);

    let response = client
        .post(server.url("/api/normalize/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["originalFormat"], "jpeg");
    assert_eq!(json["width"], 64);
}

#[tokio::test]
async fn test_multipart_without_file() {
    let server = TestServer::start().await;
    let client = server.client();

    let form = multipart::Form::new().text("note", "no image here");
    let response = client
        .post(server.url("/api/normalize/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_auth_required() {
    let server = TestServer::start_with_auth(vec!["secret".to_string()]).await;
    let client = server.client();
    let body = json!({ "image": data_url("image/jpeg", &create_test_jpeg(600, 600, 80)) });

    let response = client
        .post(server.url("/api/normalize"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(server.url("/api/normalize"))
        .header("x-api-key", "wrong")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(server.url("/api/normalize"))
        .bearer_auth("secret")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Health stays public
    let response = client.get(server.url("/health/live")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit() {
    let server = TestServer::start_with_rate_limit().await;
    let client = server.client();

    for _ in 0..2 {
        let response = client.get(server.url("/health/live")).send().await.unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = client.get(server.url("/health/live")).send().await.unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let server = TestServer::start().await;
    let client = server.client();

    let response = client.get(server.url("/health/live")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");

    let response = client.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["constraints"]["min_short_side"], 512);
    assert_eq!(json["constraints"]["max_long_side"], 4096);
    assert_eq!(json["alwaysReinsertHuffmanTables"], true);
}
