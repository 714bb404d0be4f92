//! mdshot: markdown to image conversion
//!
//! Renders a markdown document inside a pooled headless Chrome session and
//! captures the result as an image. The pipeline profiles document content
//! to pick adaptive settings, reuses one warmed-up engine session across
//! conversions (recycling it under memory pressure), and falls back to a
//! local-font document when remote fonts fail to load.
//!
//! # Example
//!
//! ```no_run
//! use mdshot::{Converter, ConverterConfig, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = Converter::new(ConverterConfig::default());
//! let result = converter.convert_to_bytes("# Hello\nWorld", &RenderOptions::default())?;
//! println!("{} bytes of {}", result.size, result.format);
//! converter.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod config;
pub mod convert;
pub mod document;
pub mod profile;
pub mod session;

// Async-friendly facade (worker-thread backed)
pub mod async_api;

pub use async_api::AsyncConverter;
pub use config::{FontStrategy, ImageFormat, Preset, RenderOptions, ResolvedConfig, Theme};
pub use convert::{
    Base64Render, BatchItem, BatchRecord, Converter, FileRender, PhaseTimings, RenderResult,
};
pub use profile::{analyze, Complexity, ContentProfile};
pub use session::{SessionHandle, SessionManager};

/// Bounds for every network or render wait in the capture pipeline. On
/// expiry, control returns to the pipeline; there is no other cancellation
/// mechanism.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// First load, waiting for network quiescence
    pub page_load_ms: u64,
    /// Local-font fallback reload, waiting for initial parse only
    pub fallback_load_ms: u64,
    /// Opportunistic in-document font readiness wait
    pub font_wait_ms: u64,
    /// Opportunistic minimum-rendered-height wait
    pub render_wait_ms: u64,
    /// Screenshot capture
    pub screenshot_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_ms: 6000,
            fallback_load_ms: 4000,
            font_wait_ms: 2000,
            render_wait_ms: 1000,
            screenshot_ms: 10000,
        }
    }
}

/// Configuration for a `Converter` instance
#[derive(Debug, Clone, Copy)]
pub struct ConverterConfig {
    pub timeouts: Timeouts,
    /// Engine resident-memory threshold that triggers post-capture session
    /// recycling
    pub memory_limit_bytes: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            memory_limit_bytes: session::DEFAULT_MEMORY_LIMIT_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.page_load_ms, 6000);
        assert_eq!(timeouts.fallback_load_ms, 4000);
        assert_eq!(timeouts.font_wait_ms, 2000);
        assert_eq!(timeouts.render_wait_ms, 1000);
    }

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.memory_limit_bytes, 200 * 1024 * 1024);
    }
}
