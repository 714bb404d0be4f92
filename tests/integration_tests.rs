//! Integration tests for the conversion pipeline
//!
//! Chrome-dependent tests are marked `#[ignore]`; run them locally with
//! `cargo test -- --ignored` when a Chrome binary is available.

use mdshot::{
    BatchItem, Converter, ConverterConfig, ImageFormat, RenderOptions, SessionManager, Timeouts,
};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mdshot-test-{}-{name}", std::process::id()))
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_session_is_reused_across_acquires() {
    let manager = SessionManager::new(mdshot::session::DEFAULT_MEMORY_LIMIT_BYTES);

    let first = manager.acquire().expect("first acquire");
    let second = manager.acquire().expect("second acquire");
    assert_eq!(first.id(), second.id());

    manager.recycle();
    let third = manager.acquire().expect("acquire after recycle");
    assert_ne!(first.id(), third.id());

    manager.shutdown();
    manager.shutdown();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_end_to_end_defaults() {
    let converter = Converter::new(ConverterConfig::default());
    let result = converter
        .convert_to_bytes("# Hello\nWorld", &RenderOptions::default())
        .expect("conversion failed");

    assert_eq!(result.format, ImageFormat::Webp);
    assert_eq!(result.width, 800);
    assert_eq!(result.size, result.bytes.len());
    assert!(result.size > 100, "image seems too small");
    // WebP files are RIFF containers.
    assert_eq!(&result.bytes[0..4], b"RIFF");
    assert_eq!(&result.bytes[8..12], b"WEBP");

    converter.shutdown();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_png_output_has_png_magic() {
    let converter = Converter::new(ConverterConfig::default());
    let options = RenderOptions {
        format: Some("png".to_string()),
        ..Default::default()
    };
    let result = converter
        .convert_to_bytes("# PNG test", &options)
        .expect("conversion failed");
    assert_eq!(&result.bytes[0..8], b"\x89PNG\r\n\x1a\n");
    converter.shutdown();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_first_load_timeout_falls_back_to_local_fonts() {
    // An unreachable page-load deadline forces the quiescence wait to expire,
    // so the capture must recover through the single local-font reload.
    let config = ConverterConfig {
        timeouts: Timeouts {
            page_load_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let converter = Converter::new(config);
    let result = converter
        .convert_to_bytes("# Fallback\nStill renders", &RenderOptions::default())
        .expect("fallback conversion failed");
    assert!(result.size > 100);
    converter.shutdown();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_base64_variant() {
    let converter = Converter::new(ConverterConfig::default());
    let rendered = converter
        .convert_to_base64("# Base64", &RenderOptions::default())
        .expect("conversion failed");

    assert_eq!(rendered.mime_type, "image/webp");
    assert!(rendered.data_url.starts_with("data:image/webp;base64,"));
    assert!(!rendered.base64.is_empty());
    converter.shutdown();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_batch_isolates_per_item_failures() {
    let good_one = temp_path("batch-1.md");
    let good_two = temp_path("batch-3.md");
    std::fs::write(&good_one, "# One").unwrap();
    std::fs::write(&good_two, "# Three").unwrap();
    let out_dir = temp_path("batch-out");

    let items = vec![
        BatchItem {
            input: good_one.clone(),
            output: out_dir.join("one.webp"),
            options: RenderOptions::default(),
        },
        BatchItem {
            input: temp_path("does-not-exist.md"),
            output: out_dir.join("two.webp"),
            options: RenderOptions::default(),
        },
        BatchItem {
            input: good_two.clone(),
            output: out_dir.join("three.webp"),
            options: RenderOptions::default(),
        },
    ];

    let converter = Converter::new(ConverterConfig::default());
    let records = converter.convert_all(&items);
    converter.shutdown();

    assert_eq!(records.len(), 3);
    assert!(records[0].success);
    assert!(!records[1].success);
    assert!(records[2].success);
    assert!(!records[1].error.as_deref().unwrap_or("").is_empty());
    assert!(out_dir.join("one.webp").exists());
    assert!(out_dir.join("three.webp").exists());

    let _ = std::fs::remove_file(good_one);
    let _ = std::fs::remove_file(good_two);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_async_facade_convert() {
    let converter = mdshot::AsyncConverter::new(ConverterConfig::default());
    let result = converter
        .convert("# Async\nHello", RenderOptions::default())
        .await
        .expect("async conversion failed");
    assert_eq!(result.width, 800);
    assert!(result.size > 100);
    converter.shutdown().await.expect("shutdown failed");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_dark_theme_and_custom_style() {
    let converter = Converter::new(ConverterConfig::default());
    let options = RenderOptions {
        theme: Some("dark".to_string()),
        custom_style: Some("body { border: 4px solid red }".to_string()),
        ..Default::default()
    };
    let result = converter
        .convert_to_bytes("# Styled", &options)
        .expect("conversion failed");
    assert!(result.size > 100);
    converter.shutdown();
}
