//! Document builder: markdown body + theme stylesheet -> renderable HTML
//!
//! Building is deterministic; identical inputs yield byte-identical
//! documents. The custom stylesheet is appended after the theme sheet so
//! custom rules always win.

use crate::config::{FontStrategy, Theme};
use comrak::Options;

/// GitHub-flavored light theme. References the remote font service; whether
/// those fonts actually load is handled by the capture pipeline, not here.
pub const DEFAULT_CSS: &str = r#"
@import url('https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&family=JetBrains+Mono:wght@400;500&display=swap');

body {
  font-family: 'Inter', -apple-system, BlinkMacSystemFont, 'SF Pro Display', 'SF Pro Text', 'Roboto', 'Helvetica Neue', 'Apple Color Emoji', 'Segoe UI Emoji', 'Noto Color Emoji', 'PingFang SC', 'Hiragino Sans GB', 'Source Han Sans CN', 'Noto Sans CJK SC', 'Noto Sans', 'Liberation Sans', 'Microsoft YaHei UI', 'Microsoft YaHei', Arial, sans-serif;
  line-height: 1.6;
  padding: 24px;
  max-width: 800px;
  margin: 0 auto;
  color: #24292f;
  background-color: #ffffff;
  font-size: 16px;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}

.emoji {
  font-family: 'Apple Color Emoji', 'Segoe UI Emoji', 'Noto Color Emoji', sans-serif;
  font-style: normal;
}

h1, h2, h3, h4, h5, h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
  color: #24292f;
}

h1 {
  font-size: 2em;
  border-bottom: 1px solid #d0d7de;
  padding-bottom: 12px;
  margin-bottom: 24px;
}

h2 {
  font-size: 1.5em;
  border-bottom: 1px solid #d0d7de;
  padding-bottom: 10px;
  margin-bottom: 20px;
}

h3 { font-size: 1.25em; }
h4 { font-size: 1.1em; }
h5 { font-size: 0.95em; }
h6 { font-size: 0.85em; color: #656d76; }

p {
  margin-bottom: 16px;
  color: #24292f;
  text-align: left;
}

ul, ol {
  margin-bottom: 16px;
  padding-left: 2em;
}

li {
  margin-bottom: 8px;
  color: #24292f;
}

pre {
  background-color: #f6f8fa;
  border-radius: 6px;
  padding: 16px;
  overflow: auto;
  margin-bottom: 16px;
  border: 1px solid #d0d7de;
}

code {
  font-family: 'JetBrains Mono', 'SF Mono', 'Monaco', 'Roboto Mono', 'Liberation Mono', 'Fira Code', 'Consolas', 'DejaVu Sans Mono', 'Ubuntu Mono', monospace;
  font-size: 85%;
  background-color: #f6f8fa;
  padding: 0.2em 0.4em;
  border-radius: 6px;
  border: 1px solid #d0d7de;
  color: #24292f;
}

pre code {
  background-color: transparent;
  border: none;
  padding: 0;
  font-size: 14px;
}

blockquote {
  color: #656d76;
  border-left: 0.25em solid #d1d9e0;
  margin: 16px 0;
  background-color: #f6f8fa;
  border-radius: 3px;
  padding: 8px 16px;
}

blockquote p {
  margin-bottom: 8px;
}

img {
  max-width: 100%;
  height: auto;
  border-radius: 6px;
}

table {
  border-spacing: 0;
  border-collapse: collapse;
  margin-bottom: 16px;
  width: 100%;
  border: 1px solid #d1d9e0;
  border-radius: 6px;
  overflow: hidden;
}

table th, table td {
  padding: 6px 13px;
  border: 1px solid #d1d9e0;
  text-align: left;
}

table th {
  background-color: #f6f8fa;
  font-weight: 600;
}

table tr:nth-child(2n) {
  background-color: #f6f8fa;
}

hr {
  border: none;
  border-top: 1px solid #d1d9e0;
  margin: 24px 0;
}

a {
  color: #0969da;
  text-decoration: none;
}

a:hover {
  text-decoration: underline;
}

strong {
  font-weight: 600;
}

em {
  font-style: italic;
}

.task-list-item {
  list-style: none;
  margin-left: -1.5em;
}

.task-list-item-checkbox {
  margin-right: 8px;
  margin-left: 0;
}

input[type="checkbox"] {
  margin-right: 8px;
}
"#;

/// Dark theme
pub const DARK_CSS: &str = r#"
body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
  line-height: 1.6;
  padding: 20px;
  max-width: 800px;
  margin: 0 auto;
  color: #f0f6fc;
  background-color: #0d1117;
}

h1, h2, h3, h4, h5, h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
  color: #f0f6fc;
}

h1 {
  font-size: 2em;
  border-bottom: 1px solid #30363d;
  padding-bottom: 10px;
}

h2 {
  font-size: 1.5em;
  border-bottom: 1px solid #30363d;
  padding-bottom: 8px;
}

pre {
  background-color: #161b22;
  border-radius: 6px;
  padding: 16px;
  overflow: auto;
  margin-bottom: 16px;
  border: 1px solid #30363d;
}

code {
  background-color: #161b22;
  color: #f0f6fc;
  border: 1px solid #30363d;
}

blockquote {
  color: #8b949e;
  border-left: 0.25em solid #30363d;
  background-color: #161b22;
}

table {
  border: 1px solid #30363d;
}

table th, table td {
  border: 1px solid #30363d;
}

table th {
  background-color: #161b22;
}

table tr:nth-child(2n) {
  background-color: #161b22;
}
"#;

/// Minimal serif theme
pub const MINIMAL_CSS: &str = r#"
body {
  font-family: Georgia, serif;
  line-height: 1.8;
  padding: 40px;
  max-width: 700px;
  margin: 0 auto;
  color: #333;
  background-color: #fff;
}

h1, h2, h3, h4, h5, h6 {
  font-family: -apple-system, sans-serif;
  margin-top: 2em;
  margin-bottom: 0.5em;
  font-weight: normal;
}

h1 { font-size: 2.2em; }
h2 { font-size: 1.8em; }
h3 { font-size: 1.4em; }

p {
  margin-bottom: 1.5em;
  text-align: justify;
}

pre, code {
  font-family: 'Courier New', monospace;
  background-color: #f8f8f8;
  border: 1px solid #e1e1e1;
}

blockquote {
  border-left: 3px solid #ccc;
  margin-left: 0;
  padding-left: 20px;
  font-style: italic;
  color: #666;
}
"#;

/// Local-font variant of the default theme: same layout, but the font stack
/// is restricted to system fonts so the document needs no network fetches.
pub const LOCAL_FONT_CSS: &str = r#"
body {
  font-family: -apple-system, BlinkMacSystemFont, 'SF Pro Display', 'SF Pro Text', 'Roboto', 'Helvetica Neue', 'Apple Color Emoji', 'Segoe UI Emoji', 'Noto Color Emoji', 'PingFang SC', 'Hiragino Sans GB', 'Source Han Sans CN', 'Noto Sans CJK SC', 'Noto Sans', 'Liberation Sans', 'Microsoft YaHei UI', 'Microsoft YaHei', Arial, sans-serif;
  line-height: 1.6;
  padding: 24px;
  max-width: 800px;
  margin: 0 auto;
  color: #24292f;
  background-color: #ffffff;
  font-size: 16px;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}

.emoji {
  font-family: 'Apple Color Emoji', 'Segoe UI Emoji', 'Noto Color Emoji', sans-serif;
  font-style: normal;
}

h1, h2, h3, h4, h5, h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
  color: #24292f;
}

h1 {
  font-size: 2em;
  border-bottom: 1px solid #d0d7de;
  padding-bottom: 12px;
  margin-bottom: 24px;
}

h2 {
  font-size: 1.5em;
  border-bottom: 1px solid #d0d7de;
  padding-bottom: 10px;
  margin-bottom: 20px;
}

h3 { font-size: 1.25em; }
h4 { font-size: 1.1em; }
h5 { font-size: 0.95em; }
h6 { font-size: 0.85em; color: #656d76; }

p {
  margin-bottom: 16px;
  color: #24292f;
  text-align: left;
}

ul, ol {
  margin-bottom: 16px;
  padding-left: 2em;
}

li {
  margin-bottom: 8px;
  color: #24292f;
}

pre {
  background-color: #f6f8fa;
  border-radius: 6px;
  padding: 16px;
  overflow: auto;
  margin-bottom: 16px;
  border: 1px solid #d0d7de;
}

code {
  font-family: 'SF Mono', 'Monaco', 'Roboto Mono', 'Liberation Mono', 'Fira Code', 'Consolas', 'DejaVu Sans Mono', 'Ubuntu Mono', 'Courier New', monospace;
  font-size: 85%;
  background-color: #f6f8fa;
  padding: 0.2em 0.4em;
  border-radius: 6px;
  border: 1px solid #d0d7de;
  color: #24292f;
}

pre code {
  background-color: transparent;
  border: none;
  padding: 0;
  font-size: 14px;
}

blockquote {
  padding: 8px 16px;
  color: #656d76;
  border-left: 0.25em solid #d0d7de;
  margin: 16px 0;
  background-color: #f6f8fa;
  border-radius: 3px;
}

blockquote p {
  margin-bottom: 8px;
}

img {
  max-width: 100%;
  height: auto;
  border-radius: 6px;
}

table {
  border-spacing: 0;
  border-collapse: collapse;
  margin-bottom: 16px;
  width: 100%;
  border: 1px solid #d0d7de;
  border-radius: 6px;
  overflow: hidden;
}

table th, table td {
  padding: 6px 13px;
  border: 1px solid #d0d7de;
  text-align: left;
}

table th {
  background-color: #f6f8fa;
  font-weight: 600;
}

table tr:nth-child(2n) {
  background-color: #f6f8fa;
}

hr {
  border: none;
  border-top: 1px solid #d0d7de;
  margin: 24px 0;
}

a {
  color: #0969da;
  text-decoration: none;
}

a:hover {
  text-decoration: underline;
}

strong {
  font-weight: 600;
}

em {
  font-style: italic;
}

.task-list-item {
  list-style: none;
  margin-left: -1.5em;
}

.task-list-item-checkbox {
  margin-right: 8px;
  margin-left: 0;
}

input[type="checkbox"] {
  margin-right: 8px;
}
"#;

/// Stylesheet for a theme. A `Local` font strategy overrides the theme with
/// the local-font variant so the fallback reload needs no network at all.
pub fn theme_css(theme: Theme, fonts: FontStrategy) -> &'static str {
    if fonts == FontStrategy::Local {
        return LOCAL_FONT_CSS;
    }
    match theme {
        Theme::Default => DEFAULT_CSS,
        Theme::Dark => DARK_CSS,
        Theme::Minimal => MINIMAL_CSS,
        Theme::LocalFonts => LOCAL_FONT_CSS,
    }
}

/// Render markdown to an HTML body fragment (GFM extensions enabled).
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    // Raw HTML in the source passes through, matching the reference renderer.
    options.render.r#unsafe = true;
    comrak::markdown_to_html(markdown, &options)
}

/// Assemble a complete self-contained HTML document from a rendered body,
/// a theme, a custom style override, and the font strategy.
pub fn build_document(
    body_html: &str,
    theme: Theme,
    custom_style: &str,
    fonts: FontStrategy,
) -> String {
    let css = theme_css(theme, fonts);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Markdown Document</title>\n\
         <style>{css}\n{custom_style}</style>\n\
         </head>\n\
         <body>\n\
         {body_html}\n\
         </body>\n\
         </html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_idempotent() {
        let body = render_markdown("# Hello\nWorld");
        let a = build_document(&body, Theme::Default, "", FontStrategy::External);
        let b = build_document(&body, Theme::Default, "", FontStrategy::External);
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_style_is_appended_after_theme() {
        let custom = "body { background: rebeccapurple }";
        let doc = build_document("<p>x</p>", Theme::Dark, custom, FontStrategy::External);
        let theme_pos = doc.find("background-color: #0d1117").unwrap();
        let custom_pos = doc.find(custom).unwrap();
        assert!(custom_pos > theme_pos);
    }

    #[test]
    fn test_local_strategy_has_no_remote_fetches() {
        let doc = build_document("<p>x</p>", Theme::Default, "", FontStrategy::Local);
        assert!(!doc.contains("fonts.googleapis.com"));
        assert!(!doc.contains("@import"));
    }

    #[test]
    fn test_external_default_references_font_service() {
        let doc = build_document("<p>x</p>", Theme::Default, "", FontStrategy::External);
        assert!(doc.contains("fonts.googleapis.com"));
    }

    #[test]
    fn test_markdown_gfm_extensions() {
        let html = render_markdown("- [x] done\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<del>"));
    }

    #[test]
    fn test_raw_html_passthrough() {
        let html = render_markdown("before <kbd>Ctrl</kbd> after");
        assert!(html.contains("<kbd>Ctrl</kbd>"));

        // Block-level raw HTML is emitted verbatim, never escaped.
        let html = render_markdown("<div class=\"note\">hi</div>");
        assert!(html.contains("<div class=\"note\">hi</div>"));
        assert!(!html.contains("&lt;div"));
    }

    #[test]
    fn test_document_is_self_contained() {
        let doc = build_document("<p>x</p>", Theme::Minimal, "", FontStrategy::External);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"UTF-8\">"));
        assert!(doc.contains("</html>"));
    }
}
