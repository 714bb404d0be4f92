//! Capture pipeline: ephemeral surface, resource policy, bounded waits,
//! and screenshot production for a single document.

use crate::config::{FontStrategy, ImageFormat, ResolvedConfig};
use crate::document;
use crate::error::{Error, Result};
use crate::session::SessionHandle;
use crate::Timeouts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision, Tab};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::types::Bounds;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Remote font service hosts whose requests are always allowed through the
/// resource policy and whose failure triggers the local-font fallback.
const FONT_SERVICE_HOSTS: &[&str] = &["fonts.googleapis.com", "fonts.gstatic.com"];

const READY_COMPLETE: &str = "document.readyState === 'complete'";
const DOM_READY: &str = "document.readyState !== 'loading'";
const FONTS_READY: &str = "!document.fonts || document.fonts.status === 'loaded'";
const CONTENT_PAINTED: &str =
    "(() => { const b = document.body; return !!b && b.offsetHeight > 100; })()";

/// Result of a bounded wait. Expiry returns control to the pipeline; the
/// caller decides whether a timeout is fatal, recovered, or tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut,
}

/// Declarative per-request decision of the resource-loading policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Allow,
    Abort,
}

/// Resource-loading policy: font fetches (remote font service or local font
/// files) are allowed, image and media fetches are aborted outright since
/// they never affect the captured content, everything else passes through.
pub fn resource_policy(kind: &Network::ResourceType, url: &str) -> PolicyAction {
    if FONT_SERVICE_HOSTS.iter().any(|host| url.contains(host)) {
        return PolicyAction::Allow;
    }
    match kind {
        Network::ResourceType::Font => PolicyAction::Allow,
        Network::ResourceType::Image | Network::ResourceType::Media => PolicyAction::Abort,
        _ => PolicyAction::Allow,
    }
}

/// Bytes plus the phase timings measured inside the pipeline
pub(crate) struct CaptureOutput {
    pub bytes: Vec<u8>,
    pub content_load_ms: u64,
    pub capture_ms: u64,
}

/// Drive one render-and-capture sequence on an ephemeral surface issued
/// from the session. The surface is closed in a final step regardless of
/// how the capture itself ended.
pub(crate) fn capture(
    session: &SessionHandle,
    body_html: &str,
    config: &ResolvedConfig,
    timeouts: &Timeouts,
) -> Result<CaptureOutput> {
    let tab = session
        .browser
        .new_tab()
        .map_err(|e| Error::Capture(format!("failed to open rendering surface: {e}")))?;

    let result = run_capture(&tab, body_html, config, timeouts);

    if let Err(e) = tab.close(true) {
        warn!("failed to close rendering surface: {e}");
    }
    result
}

fn run_capture(
    tab: &Arc<Tab>,
    body_html: &str,
    config: &ResolvedConfig,
    timeouts: &Timeouts,
) -> Result<CaptureOutput> {
    tab.set_default_timeout(Duration::from_millis(timeouts.page_load_ms));

    // Engine-internal script errors are observed and recorded but must not
    // abort the capture.
    let observer = r#"window.addEventListener('error', function (e) {
        (window.__mdshot_errors = window.__mdshot_errors || []).push(String(e.message));
        e.preventDefault();
    });"#;
    tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
        source: observer.to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })
    .map_err(|e| Error::Capture(format!("failed to install error observer: {e}")))?;

    install_resource_policy(tab)?;

    let load_start = Instant::now();

    // Load the external-font document, waiting for network quiescence.
    let doc = document::build_document(
        body_html,
        config.theme,
        &config.custom_style,
        config.font_strategy,
    );
    let font_load_failed = match navigate_to_document(tab, &doc) {
        Ok(()) => {
            match wait_for_condition(
                tab,
                READY_COMPLETE,
                Duration::from_millis(timeouts.page_load_ms),
            ) {
                WaitOutcome::Completed => {
                    // Opportunistic font-readiness wait; a timeout here only
                    // marks font loading as failed, it never aborts.
                    wait_for_condition(
                        tab,
                        FONTS_READY,
                        Duration::from_millis(timeouts.font_wait_ms),
                    ) == WaitOutcome::TimedOut
                }
                WaitOutcome::TimedOut => true,
            }
        }
        Err(e) => {
            warn!("initial document load failed: {e}");
            true
        }
    };

    // Single allowed fallback: rebuild with local fonts and reload with a
    // shorter wait for initial parse only. A second failure is fatal.
    if font_load_failed {
        warn!("external font loading failed, switching to local fonts");
        let local_doc = document::build_document(
            body_html,
            config.theme,
            &config.custom_style,
            FontStrategy::Local,
        );
        tab.set_default_timeout(Duration::from_millis(timeouts.fallback_load_ms));
        navigate_to_document(tab, &local_doc)?;
        if wait_for_condition(
            tab,
            DOM_READY,
            Duration::from_millis(timeouts.fallback_load_ms),
        ) == WaitOutcome::TimedOut
        {
            return Err(Error::Timeout(timeouts.fallback_load_ms));
        }
    }

    // Best-effort wait for the body to reach a minimum rendered height.
    if wait_for_condition(
        tab,
        CONTENT_PAINTED,
        Duration::from_millis(timeouts.render_wait_ms),
    ) == WaitOutcome::TimedOut
    {
        debug!("content paint check timed out, proceeding with capture");
    }

    let height = measure_body_height(tab)?;
    let content_load_ms = load_start.elapsed().as_millis() as u64;

    // Configure the output surface to the resolved width and measured height.
    tab.set_bounds(Bounds::Normal {
        left: None,
        top: None,
        width: Some(config.width as f64),
        height: Some(height as f64),
    })
    .map_err(|e| Error::Capture(format!("failed to size rendering surface: {e}")))?;

    let capture_start = Instant::now();
    tab.set_default_timeout(Duration::from_millis(timeouts.screenshot_ms));

    let format = match config.format {
        ImageFormat::Png => Page::CaptureScreenshotFormatOption::Png,
        ImageFormat::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
        ImageFormat::Webp => Page::CaptureScreenshotFormatOption::Webp,
    };
    // Quality applies to the lossy raster format only.
    let quality = (config.format == ImageFormat::Jpeg).then_some(config.quality as u32);
    let clip = Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: config.width as f64,
        height: height as f64,
        scale: config.scale_factor,
    };
    let bytes = tab
        .capture_screenshot(format, quality, Some(clip), true)
        .map_err(|e| Error::Capture(format!("screenshot failed: {e}")))?;
    let capture_ms = capture_start.elapsed().as_millis() as u64;

    Ok(CaptureOutput {
        bytes,
        content_load_ms,
        capture_ms,
    })
}

fn install_resource_policy(tab: &Arc<Tab>) -> Result<()> {
    tab.enable_fetch(None, Some(false))
        .map_err(|e| Error::Capture(format!("failed to enable request interception: {e}")))?;

    let interceptor: Arc<dyn RequestInterceptor + Send + Sync> =
        Arc::new(move |_transport, _session_id, event: RequestPausedEvent| {
            let url = &event.params.request.url;
            match resource_policy(&event.params.resource_Type, url) {
                PolicyAction::Allow => RequestPausedDecision::Continue(None),
                PolicyAction::Abort => {
                    debug!(
                        "aborting {:?} resource fetch: {url}",
                        event.params.resource_Type
                    );
                    RequestPausedDecision::Fail(FailRequest {
                        request_id: event.params.request_id.clone(),
                        error_reason: Network::ErrorReason::Aborted,
                    })
                }
            }
        });

    tab.enable_request_interception(interceptor)
        .map_err(|e| Error::Capture(format!("failed to install resource policy: {e}")))?;
    Ok(())
}

fn navigate_to_document(tab: &Tab, html: &str) -> Result<()> {
    let url = format!("data:text/html;charset=utf-8;base64,{}", BASE64.encode(html));
    tab.navigate_to(&url)
        .map_err(|e| Error::Load(format!("navigation failed: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| Error::Load(format!("wait for navigation failed: {e}")))?;
    Ok(())
}

/// Poll a boolean page expression until it holds or the deadline passes.
/// Evaluation errors are treated as "not yet" so engine hiccups never abort
/// an opportunistic wait.
fn wait_for_condition(tab: &Tab, expr: &str, timeout: Duration) -> WaitOutcome {
    let deadline = Instant::now() + timeout;
    loop {
        match tab.evaluate(expr, false) {
            Ok(result) => {
                if result.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                    return WaitOutcome::Completed;
                }
            }
            Err(e) => debug!("condition poll failed: {e}"),
        }
        if Instant::now() >= deadline {
            return WaitOutcome::TimedOut;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Bounding height of the rendered body. Absence of a body element means
/// the input produced no renderable content.
fn measure_body_height(tab: &Tab) -> Result<u32> {
    let expr =
        "(() => { const b = document.body; return b ? Math.ceil(b.getBoundingClientRect().height) : -1; })()";
    let result = tab
        .evaluate(expr, false)
        .map_err(|e| Error::Capture(format!("failed to measure content extent: {e}")))?;
    match result.value.and_then(|v| v.as_f64()) {
        Some(h) if h >= 0.0 => Ok(h.ceil().max(1.0) as u32),
        _ => Err(Error::SurfaceMissing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_aborts_images_and_media() {
        let action = resource_policy(&Network::ResourceType::Image, "https://cdn.example.com/a.png");
        assert_eq!(action, PolicyAction::Abort);
        let action = resource_policy(&Network::ResourceType::Media, "https://cdn.example.com/a.mp4");
        assert_eq!(action, PolicyAction::Abort);
    }

    #[test]
    fn test_policy_allows_fonts() {
        let action = resource_policy(&Network::ResourceType::Font, "file:///usr/share/fonts/x.ttf");
        assert_eq!(action, PolicyAction::Allow);
    }

    #[test]
    fn test_policy_allows_font_service_regardless_of_kind() {
        let action = resource_policy(
            &Network::ResourceType::Stylesheet,
            "https://fonts.googleapis.com/css2?family=Inter",
        );
        assert_eq!(action, PolicyAction::Allow);
        let action = resource_policy(
            &Network::ResourceType::Font,
            "https://fonts.gstatic.com/s/inter/x.woff2",
        );
        assert_eq!(action, PolicyAction::Allow);
    }

    #[test]
    fn test_policy_allows_everything_else() {
        for kind in [
            Network::ResourceType::Document,
            Network::ResourceType::Stylesheet,
            Network::ResourceType::Script,
            Network::ResourceType::Xhr,
        ] {
            assert_eq!(
                resource_policy(&kind, "https://example.com/resource"),
                PolicyAction::Allow
            );
        }
    }
}
