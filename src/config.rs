//! Render options, preset bundles, and the config resolver
//!
//! The resolver merges four layers into one validated `ResolvedConfig`,
//! highest precedence first: explicit caller fields that differ from the
//! system default, a named preset bundle, adaptive recommendations derived
//! from the content profile, and finally the system defaults. Validation is
//! field-scoped: an out-of-domain value is silently replaced by its default
//! and never fails the whole request.

use crate::profile::{Complexity, ContentProfile};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_QUALITY: u8 = 75;
pub const DEFAULT_SCALE_FACTOR: f64 = 2.0;

pub const MIN_WIDTH: u32 = 200;
pub const MAX_WIDTH: u32 = 3000;
pub const MIN_SCALE_FACTOR: f64 = 1.0;
pub const MAX_SCALE_FACTOR: f64 = 3.0;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless raster (PNG)
    Png,
    /// Lossy raster (JPEG); the only format that takes a quality parameter
    /// at capture time
    Jpeg,
    /// WebP, the default: smaller files at comparable quality
    Webp,
}

impl ImageFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Built-in document style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// GitHub-flavored light theme with remote web fonts
    Default,
    Dark,
    Minimal,
    /// Font stack restricted to bundled/system fonts; no remote fetches
    #[serde(rename = "local")]
    LocalFonts,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Some(Theme::Default),
            "dark" => Some(Theme::Dark),
            "minimal" => Some(Theme::Minimal),
            "local" | "local-fonts" => Some(Theme::LocalFonts),
            _ => None,
        }
    }
}

/// Raw conversion options as supplied by a caller.
///
/// All fields are optional; an unset field defers to the preset, adaptive
/// recommendation, or system default during resolution. Unrecognized keys
/// in a deserialized options object are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub width: Option<u32>,
    pub format: Option<String>,
    pub quality: Option<u8>,
    pub theme: Option<String>,
    pub custom_style: Option<String>,
    pub scale_factor: Option<f64>,
    /// Named preset bundle (web | mobile | print | archive)
    pub preset: Option<String>,
    /// Apply content-adaptive recommendations for unset fields
    pub adaptive: bool,
}

/// Fixed parameter bundle selected by a preset name
#[derive(Debug, Clone, Copy)]
pub struct PresetBundle {
    pub quality: u8,
    pub format: ImageFormat,
    pub scale_factor: f64,
    pub width: u32,
    pub rationale: &'static str,
}

/// The closed set of named presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Web,
    Mobile,
    Print,
    Archive,
}

impl Preset {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "web" => Some(Preset::Web),
            "mobile" => Some(Preset::Mobile),
            "print" => Some(Preset::Print),
            "archive" => Some(Preset::Archive),
            _ => None,
        }
    }

    pub fn bundle(&self) -> PresetBundle {
        match self {
            Preset::Web => PresetBundle {
                quality: 75,
                format: ImageFormat::Webp,
                scale_factor: 2.0,
                width: 800,
                rationale: "web display: balanced quality and load time",
            },
            Preset::Mobile => PresetBundle {
                quality: 70,
                format: ImageFormat::Webp,
                scale_factor: 1.0,
                width: 600,
                rationale: "mobile: smallest files, saves bandwidth",
            },
            Preset::Print => PresetBundle {
                quality: 90,
                format: ImageFormat::Webp,
                scale_factor: 2.0,
                width: 1200,
                rationale: "print: high resolution output",
            },
            Preset::Archive => PresetBundle {
                quality: 60,
                format: ImageFormat::Webp,
                scale_factor: 1.0,
                width: 800,
                rationale: "archive: long-term storage, space first",
            },
        }
    }
}

/// Settings recommended by the content profiler for one complexity category.
///
/// Only quality differs across categories; format and scale factor are
/// identical everywhere. Preserved from the observed source behavior.
#[derive(Debug, Clone, Copy)]
pub struct Recommendation {
    pub quality: u8,
    pub format: ImageFormat,
    pub scale_factor: f64,
    pub rationale: &'static str,
}

pub fn recommendation_for(category: Complexity) -> Recommendation {
    match category {
        Complexity::Simple => Recommendation {
            quality: 70,
            format: ImageFormat::Webp,
            scale_factor: 2.0,
            rationale: "simple document: high compression",
        },
        Complexity::Moderate => Recommendation {
            quality: 75,
            format: ImageFormat::Webp,
            scale_factor: 2.0,
            rationale: "moderate complexity: balanced settings",
        },
        Complexity::Complex => Recommendation {
            quality: 80,
            format: ImageFormat::Webp,
            scale_factor: 2.0,
            rationale: "complex document: quality preserved",
        },
    }
}

/// Font loading strategy for the renderable document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStrategy {
    /// Remote font service referenced by the theme stylesheet
    External,
    /// Bundled/system fonts only; used by the capture fallback path
    Local,
}

/// Fully validated conversion parameters. Produced once per request by
/// `resolve` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub width: u32,
    pub format: ImageFormat,
    pub quality: u8,
    pub theme: Theme,
    pub custom_style: String,
    pub scale_factor: f64,
    pub font_strategy: FontStrategy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            format: ImageFormat::Webp,
            quality: DEFAULT_QUALITY,
            theme: Theme::Default,
            custom_style: String::new(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            font_strategy: FontStrategy::External,
        }
    }
}

/// Per-field precedence: an explicit value that differs from the system
/// default wins; an unset or default-looking value defers to the preset,
/// then the adaptive recommendation, then the default.
fn pick<T: PartialEq + Copy>(user: Option<T>, preset: Option<T>, adaptive: Option<T>, default: T) -> T {
    match user {
        Some(v) if v != default => v,
        _ => preset.or(adaptive).unwrap_or(default),
    }
}

/// Merge raw options with preset, adaptive, and default layers into a
/// `ResolvedConfig`. The resolver always starts the font strategy at
/// `External`; only the capture pipeline downgrades a running request to
/// `Local`.
pub fn resolve(options: &RenderOptions, profile: Option<&ContentProfile>) -> ResolvedConfig {
    // Field-scoped validation: discard out-of-domain values individually.
    let width = options.width.filter(|w| {
        let ok = (MIN_WIDTH..=MAX_WIDTH).contains(w);
        if !ok {
            debug!("discarding out-of-range width {w}, falling back to default");
        }
        ok
    });
    let quality = options.quality.filter(|q| {
        let ok = (1..=100).contains(q);
        if !ok {
            debug!("discarding out-of-range quality {q}, falling back to default");
        }
        ok
    });
    let scale_factor = options.scale_factor.filter(|s| {
        let ok = s.is_finite() && (MIN_SCALE_FACTOR..=MAX_SCALE_FACTOR).contains(s);
        if !ok {
            debug!("discarding out-of-range scale factor {s}, falling back to default");
        }
        ok
    });
    let format = options.format.as_deref().and_then(|s| {
        let parsed = ImageFormat::parse(s);
        if parsed.is_none() {
            debug!("discarding unrecognized format '{s}', falling back to default");
        }
        parsed
    });
    let theme = options.theme.as_deref().and_then(|s| {
        let parsed = Theme::parse(s);
        if parsed.is_none() {
            debug!("discarding unrecognized theme '{s}', falling back to default");
        }
        parsed
    });

    let bundle = options.preset.as_deref().and_then(|name| match Preset::parse(name) {
        Some(p) => Some(p.bundle()),
        None => {
            warn!("unknown preset '{name}', available: web, mobile, print, archive");
            None
        }
    });

    let rec = if options.adaptive {
        profile.map(|p| recommendation_for(p.category))
    } else {
        None
    };
    if let Some(r) = &rec {
        debug!("adaptive recommendation: {}", r.rationale);
    }

    ResolvedConfig {
        width: pick(width, bundle.map(|b| b.width), None, DEFAULT_WIDTH),
        format: pick(
            format,
            bundle.map(|b| b.format),
            rec.map(|r| r.format),
            ImageFormat::Webp,
        ),
        quality: pick(
            quality,
            bundle.map(|b| b.quality),
            rec.map(|r| r.quality),
            DEFAULT_QUALITY,
        ),
        theme: theme.unwrap_or(Theme::Default),
        custom_style: options.custom_style.clone().unwrap_or_default(),
        scale_factor: pick(
            scale_factor,
            bundle.map(|b| b.scale_factor),
            rec.map(|r| r.scale_factor),
            DEFAULT_SCALE_FACTOR,
        ),
        font_strategy: FontStrategy::External,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;

    #[test]
    fn test_defaults_when_unset() {
        let resolved = resolve(&RenderOptions::default(), None);
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn test_out_of_domain_width_is_defaulted_alone() {
        let options = RenderOptions {
            width: Some(5000),
            quality: Some(42),
            ..Default::default()
        };
        let resolved = resolve(&options, None);
        assert_eq!(resolved.width, DEFAULT_WIDTH);
        assert_eq!(resolved.quality, 42);
    }

    #[test]
    fn test_out_of_domain_scale_and_format_are_defaulted() {
        let options = RenderOptions {
            scale_factor: Some(5.0),
            format: Some("tiff".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&options, None);
        assert_eq!(resolved.scale_factor, DEFAULT_SCALE_FACTOR);
        assert_eq!(resolved.format, ImageFormat::Webp);
    }

    #[test]
    fn test_default_looking_quality_defers_to_preset() {
        let options = RenderOptions {
            quality: Some(DEFAULT_QUALITY),
            preset: Some("mobile".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&options, None);
        assert_eq!(resolved.quality, 70);
        assert_eq!(resolved.width, 600);
        assert_eq!(resolved.scale_factor, 1.0);
    }

    #[test]
    fn test_explicit_quality_beats_preset() {
        let options = RenderOptions {
            quality: Some(42),
            preset: Some("mobile".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&options, None);
        assert_eq!(resolved.quality, 42);
        // Other fields still come from the preset.
        assert_eq!(resolved.width, 600);
    }

    #[test]
    fn test_unknown_preset_falls_through_to_defaults() {
        let options = RenderOptions {
            preset: Some("billboard".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&options, None);
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn test_adaptive_recommendation_fills_unset_quality() {
        let complex_doc: String = (0..600)
            .map(|i| format!("# h{i}\n```\ncode\n```\n"))
            .collect();
        let p = profile::analyze(&complex_doc);
        assert_eq!(p.category, crate::profile::Complexity::Complex);

        let options = RenderOptions {
            adaptive: true,
            ..Default::default()
        };
        let resolved = resolve(&options, Some(&p));
        assert_eq!(resolved.quality, 80);
    }

    #[test]
    fn test_explicit_quality_beats_adaptive() {
        let p = profile::analyze("# minimal");
        let options = RenderOptions {
            adaptive: true,
            quality: Some(42),
            ..Default::default()
        };
        let resolved = resolve(&options, Some(&p));
        assert_eq!(resolved.quality, 42);
    }

    #[test]
    fn test_preset_beats_adaptive() {
        let p = profile::analyze("# minimal");
        let options = RenderOptions {
            adaptive: true,
            preset: Some("print".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&options, Some(&p));
        assert_eq!(resolved.quality, 90);
    }

    #[test]
    fn test_options_deserialization_ignores_unknown_keys() {
        let options: RenderOptions = serde_json::from_str(
            r#"{"width": 640, "customStyle": "body { color: red }", "scaleFactor": 1.5, "bogus": true}"#,
        )
        .unwrap();
        assert_eq!(options.width, Some(640));
        assert_eq!(options.scale_factor, Some(1.5));
        assert_eq!(options.custom_style.as_deref(), Some("body { color: red }"));
    }

    #[test]
    fn test_preset_rationales_are_nonempty() {
        for p in [Preset::Web, Preset::Mobile, Preset::Print, Preset::Archive] {
            assert!(!p.bundle().rationale.is_empty());
        }
    }

    #[test]
    fn test_resolver_never_picks_local_fonts() {
        let resolved = resolve(&RenderOptions::default(), None);
        assert_eq!(resolved.font_strategy, FontStrategy::External);
    }
}
