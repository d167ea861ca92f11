//! HTTP tests for the health and parse endpoints

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;

use common::{sample_epub, xhtml, EpubBuilder};
use folio_server::config::Config;
use folio_server::{router, AppState};

fn server() -> TestServer {
    server_with(Config::default())
}

fn server_with(config: Config) -> TestServer {
    TestServer::new(router(AppState::new(config))).unwrap()
}

fn upload(data: Vec<u8>, file_name: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data)
            .file_name(file_name)
            .mime_type("application/epub+zip"),
    )
}

#[tokio::test]
async fn test_health() {
    let server = server();
    for path in ["/health", "/api/v1/health"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert!(body["time"].as_str().is_some_and(|t| t.ends_with('Z')));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}

#[tokio::test]
async fn test_parse_rejects_other_methods() {
    let response = server().get("/parse").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn test_parse_requires_file_part() {
    let server = server();

    let form = MultipartForm::new().add_text("title", "no file here");
    let response = server.post("/parse").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["message"], "missing file");

    let response = server.post("/parse").text("not multipart").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "invalid multipart form");
}

#[tokio::test]
async fn test_parse_garbage_is_a_server_error() {
    let response = server()
        .post("/parse")
        .multipart(upload(b"definitely not a zip".to_vec(), "broken.epub"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "parse_error");
    assert_eq!(body["message"], "failed to parse epub");
}

#[tokio::test]
async fn test_parse_rejects_oversized_upload() {
    let mut config = Config::default();
    config.server.max_upload_bytes = 1024;

    let response = server_with(config)
        .post("/parse")
        .multipart(upload(vec![0u8; 64 * 1024], "big.epub"))
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_parse_aligns_sample_book() {
    let data = sample_epub();
    let size = data.len() as u64;

    let response = server()
        .post("/api/v1/parse")
        .multipart(upload(data, "sample.epub"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["fileName"], "sample.epub");
    assert_eq!(body["fileSize"], size);
    assert_eq!(body["message"], "parsed");
    assert_eq!(body["warnings"], serde_json::json!([]));

    let metadata = &body["metadata"];
    assert_eq!(metadata["title"], "Sample Book");
    assert_eq!(metadata["authors"], serde_json::json!(["Ada Writer"]));
    assert_eq!(metadata["identifiers"][0]["type"], "uuid");

    // Sections
    let sections = body["sections"].as_array().unwrap();
    let titles: Vec<&str> = sections.iter().map(|s| s["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Chapter One", "Part B", "Chapter Two"]);
    assert_eq!(sections[1]["depth"], 1);
    assert_eq!(sections[1]["parentOrderIndex"], 0);
    assert_eq!(sections[1]["href"], "text/ch1.xhtml");
    assert_eq!(sections[1]["anchor"], "b");
    assert!(sections[0].get("parentOrderIndex").is_none());
    assert!(sections[0].get("anchor").is_none());

    // One chunk per chapter; Part B shares the first chunk and loses the tie
    let chunks = body["chunks"].as_array().unwrap();
    let owners: Vec<(u64, u64)> = chunks
        .iter()
        .map(|c| {
            (
                c["sectionOrderIndex"].as_u64().unwrap(),
                c["chunkIndex"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(owners, vec![(0, 0), (2, 0)]);
    assert!(chunks[0]["content"].as_str().unwrap().starts_with("Chapter One\n\nFirst paragraph."));
    assert_eq!(chunks[1]["content"], "Chapter Two\n\nLast words here.");
    assert_eq!(chunks[1]["wordCount"], 5);
    assert!(chunks[0]["endOffset"].as_u64() < chunks[1]["startOffset"].as_u64());

    // Section blocks partition chapter one at the fragment
    let section_blocks = body["sectionBlocks"].as_array().unwrap();
    let shape: Vec<(u64, usize)> = section_blocks
        .iter()
        .map(|s| {
            (
                s["sectionOrderIndex"].as_u64().unwrap(),
                s["blocks"].as_array().unwrap().len(),
            )
        })
        .collect();
    assert_eq!(shape, vec![(0, 2), (1, 2), (2, 2)]);

    let part_b = section_blocks[1]["blocks"].as_array().unwrap();
    assert_eq!(part_b[0]["kind"], "heading");
    assert_eq!(part_b[0]["level"], 2);
    assert_eq!(part_b[0]["anchors"], serde_json::json!(["b"]));

    let image = part_b[1]["inlines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|inline| inline["kind"] == "image")
        .unwrap();
    assert_eq!(image["src"], "images/pic.png");
    assert_eq!(image["alt"], "pic");
    assert_eq!(image["width"], 3);
    assert_eq!(image["height"], 2);

    // Images and cover
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["href"], "images/pic.png");
    assert_eq!(images[0]["contentType"], "image/png");
    assert_eq!(body["cover"]["contentType"], "image/png");
    assert_eq!(body["cover"]["data"], images[0]["data"]);
}

#[tokio::test]
async fn test_parse_reports_warnings_and_falls_back_to_reading_order() {
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>No Toc</dc:title></metadata>
  <manifest>
    <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
    <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="a"/><itemref idref="b"/></spine>
</package>"#;
    let data = EpubBuilder::new()
        .file("OEBPS/content.opf", opf)
        .file("OEBPS/a.xhtml", xhtml("<p>Alpha.</p>"))
        .file("OEBPS/b.xhtml", xhtml("<p>Beta.</p>"))
        .build();

    let response = server()
        .post("/parse")
        .multipart(upload(data, "notoc.epub"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("parsed with warnings: "));
    assert_eq!(body["warnings"][0]["code"], "toc_missing");

    let sections = body["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["href"], "a.xhtml");
    assert_eq!(sections[1]["href"], "b.xhtml");

    let owners: Vec<u64> = body["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["sectionOrderIndex"].as_u64().unwrap())
        .collect();
    assert_eq!(owners, vec![0, 1]);
    assert!(body.get("images").is_none());
    assert!(body.get("cover").is_none());
}

#[tokio::test]
async fn test_document_chunk_mode_from_config() {
    let mut config = Config::default();
    config.chunking.mode = folio_server::document::ChunkMode::Document;

    let response = server_with(config)
        .post("/parse")
        .multipart(upload(sample_epub(), "sample.epub"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["chunks"].as_array().unwrap().len(), 2);
}
