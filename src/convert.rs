//! Converter facade: profiles, resolves, builds, captures, and reports
//! timings for single documents, plus the sequential batch orchestrator.

use crate::capture;
use crate::config::{self, ImageFormat, RenderOptions};
use crate::document;
use crate::error::{Error, Result};
use crate::profile;
use crate::session::SessionManager;
use crate::ConverterConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as Base64Engine;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Elapsed time per pipeline phase. Diagnostic only; never drives control
/// flow.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimings {
    pub session_acquire_ms: u64,
    pub document_setup_ms: u64,
    pub content_load_ms: u64,
    pub capture_ms: u64,
}

/// Output of a single conversion
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub bytes: Vec<u8>,
    /// Always equals `bytes.len()`
    pub size: usize,
    pub format: ImageFormat,
    pub width: u32,
    pub timings: PhaseTimings,
}

/// Base64 variant of a conversion result
#[derive(Debug, Clone, Serialize)]
pub struct Base64Render {
    pub base64: String,
    pub mime_type: String,
    pub size: usize,
    pub format: ImageFormat,
    pub width: u32,
    pub data_url: String,
}

/// File-to-file conversion result
#[derive(Debug, Clone, Serialize)]
pub struct FileRender {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub size: usize,
    pub format: ImageFormat,
    pub width: u32,
}

/// One entry of a batch conversion
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: RenderOptions,
}

/// Per-item batch outcome; failures carry the error message instead of
/// aborting the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub success: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub size: Option<usize>,
    pub error: Option<String>,
}

/// Markdown-to-image converter sharing one engine session across requests.
pub struct Converter {
    config: ConverterConfig,
    sessions: SessionManager,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let sessions = SessionManager::new(config.memory_limit_bytes);
        Self { config, sessions }
    }

    /// Convert markdown text to image bytes.
    pub fn convert_to_bytes(&self, markdown: &str, options: &RenderOptions) -> Result<RenderResult> {
        if markdown.is_empty() {
            return Err(Error::Conversion(
                "markdown content must be a non-empty string".to_string(),
            ));
        }

        // Profiling is pure and cheap, so it runs speculatively; the
        // resolver decides whether the recommendation is used.
        let profile = profile::analyze(markdown);
        let resolved = config::resolve(options, Some(&profile));

        let start = Instant::now();
        let session = self
            .sessions
            .acquire()
            .map_err(|e| Error::Conversion(format!("image generation failed: {e}")))?;
        let session_acquire_ms = start.elapsed().as_millis() as u64;

        let setup_start = Instant::now();
        let body_html = document::render_markdown(markdown);
        let document_setup_ms = setup_start.elapsed().as_millis() as u64;

        let captured = capture::capture(&session, &body_html, &resolved, &self.config.timeouts);
        // The recycling check runs between captures, after the surface is
        // closed, whether or not this capture succeeded.
        self.sessions.maybe_recycle();
        let output =
            captured.map_err(|e| Error::Conversion(format!("image generation failed: {e}")))?;

        let timings = PhaseTimings {
            session_acquire_ms,
            document_setup_ms,
            content_load_ms: output.content_load_ms,
            capture_ms: output.capture_ms,
        };
        debug!(
            "converted in {}ms (acquire {}ms, setup {}ms, load {}ms, capture {}ms)",
            start.elapsed().as_millis(),
            timings.session_acquire_ms,
            timings.document_setup_ms,
            timings.content_load_ms,
            timings.capture_ms
        );
        debug!(
            "content analysis: complexity {:.2} ({}), {} lines, {} code blocks, {} headers; quality {}, format {}",
            profile.complexity,
            profile.category,
            profile.lines,
            profile.code_blocks,
            profile.headers,
            resolved.quality,
            resolved.format
        );

        Ok(RenderResult {
            size: output.bytes.len(),
            bytes: output.bytes,
            format: resolved.format,
            width: resolved.width,
            timings,
        })
    }

    /// Convert markdown text to a base64-encoded image with metadata.
    pub fn convert_to_base64(
        &self,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<Base64Render> {
        let result = self.convert_to_bytes(markdown, options)?;
        let base64 = BASE64.encode(&result.bytes);
        let mime_type = result.format.mime_type().to_string();
        let data_url = format!("data:{mime_type};base64,{base64}");
        Ok(Base64Render {
            base64,
            mime_type,
            size: result.size,
            format: result.format,
            width: result.width,
            data_url,
        })
    }

    /// Convert a markdown file to an image file, creating parent directories
    /// of the output path as needed.
    pub fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> Result<FileRender> {
        let markdown = fs::read_to_string(input)?;
        let result = self.convert_to_bytes(&markdown, options)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output, &result.bytes)?;

        Ok(FileRender {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            size: result.size,
            format: result.format,
            width: result.width,
        })
    }

    /// Convert many files strictly sequentially. One item's failure becomes
    /// a per-item record and never stops the remaining items.
    pub fn convert_all(&self, items: &[BatchItem]) -> Vec<BatchRecord> {
        items
            .iter()
            .map(|item| {
                match self.convert_file(&item.input, &item.output, &item.options) {
                    Ok(r) => BatchRecord {
                        success: true,
                        input_path: r.input_path,
                        output_path: r.output_path,
                        size: Some(r.size),
                        error: None,
                    },
                    Err(e) => BatchRecord {
                        success: false,
                        input_path: item.input.clone(),
                        output_path: item.output.clone(),
                        size: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }

    /// Release the engine session. Idempotent; safe to call from signal
    /// handlers and again on drop paths.
    pub fn shutdown(&self) {
        self.sessions.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_markdown_is_rejected() {
        let converter = Converter::new(ConverterConfig::default());
        let err = converter
            .convert_to_bytes("", &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_batch_missing_inputs_yield_failure_records() {
        let converter = Converter::new(ConverterConfig::default());
        let items = vec![
            BatchItem {
                input: PathBuf::from("/nonexistent/a.md"),
                output: PathBuf::from("/tmp/a.webp"),
                options: RenderOptions::default(),
            },
            BatchItem {
                input: PathBuf::from("/nonexistent/b.md"),
                output: PathBuf::from("/tmp/b.webp"),
                options: RenderOptions::default(),
            },
        ];
        let records = converter.convert_all(&items);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(!record.success);
            assert!(record.size.is_none());
            assert!(!record.error.as_deref().unwrap_or("").is_empty());
        }
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let converter = Converter::new(ConverterConfig::default());
        converter.shutdown();
        converter.shutdown();
    }
}
