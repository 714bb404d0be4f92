//! Content profiler: structural analysis of a markdown document
//!
//! `analyze` is a pure function over the raw document text. It is called
//! speculatively before the resolver decides whether adaptive settings were
//! requested, so it must stay deterministic and side-effect free.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static HEADER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s").unwrap());
static LIST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s").unwrap());
static LINK_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap());
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\|.*\|").unwrap());

/// Discrete complexity category derived from the continuous score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    /// Category thresholds: `< 0.3` simple, `< 0.7` moderate, else complex
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            Complexity::Simple
        } else if score < 0.7 {
            Complexity::Moderate
        } else {
            Complexity::Complex
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        };
        f.write_str(s)
    }
}

/// Structural summary of a markdown document
#[derive(Debug, Clone)]
pub struct ContentProfile {
    pub lines: usize,
    pub code_blocks: usize,
    pub inline_code: usize,
    pub headers: usize,
    pub list_items: usize,
    pub links: usize,
    pub table_rows: usize,
    pub emojis: usize,
    /// Weighted complexity score in `[0, 1]`
    pub complexity: f64,
    pub category: Complexity,
}

/// Analyze a markdown document and score its structural complexity.
///
/// Each feature contributes a capped share of the score (length up to 0.3,
/// code blocks up to 0.25, headers up to 0.15, lists up to 0.10, the
/// remaining features combined up to 0.20), so the total never exceeds 1.0.
pub fn analyze(markdown: &str) -> ContentProfile {
    let lines = markdown.lines().count();
    let code_blocks = FENCED_CODE.find_iter(markdown).count();
    let inline_code = INLINE_CODE.find_iter(markdown).count();
    let headers = HEADER_LINE.find_iter(markdown).count();
    let list_items = LIST_LINE.find_iter(markdown).count();
    let links = LINK_SPAN.find_iter(markdown).count();
    let table_rows = TABLE_ROW.find_iter(markdown).count();
    let emojis = markdown
        .chars()
        .filter(|c| ('\u{1F300}'..='\u{1F9FF}').contains(c))
        .count();

    let mut score = 0.0;
    score += (lines as f64 / 500.0).min(0.3);
    score += (code_blocks as f64 / 20.0).min(0.25);
    score += (headers as f64 / 30.0).min(0.15);
    score += (list_items as f64 / 40.0).min(0.10);
    score += ((inline_code + links + table_rows + emojis) as f64 / 100.0).min(0.2);

    let complexity = (score * 100.0).round() / 100.0;

    ContentProfile {
        lines,
        code_blocks,
        inline_code,
        headers,
        list_items,
        links,
        table_rows,
        emojis,
        complexity,
        category: Complexity::from_score(complexity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_simple() {
        let profile = analyze("");
        assert_eq!(profile.complexity, 0.0);
        assert_eq!(profile.category, Complexity::Simple);
    }

    #[test]
    fn test_counts_structural_features() {
        let doc = "# Title\n\n- one\n- two\n\n`code` and [link](https://example.com)\n\n```rust\nfn main() {}\n```\n\n| a | b |\n|---|---|\n";
        let profile = analyze(doc);
        assert_eq!(profile.headers, 1);
        assert_eq!(profile.list_items, 2);
        assert_eq!(profile.links, 1);
        assert_eq!(profile.code_blocks, 1);
        assert_eq!(profile.table_rows, 2);
        assert!(profile.inline_code >= 1);
    }

    #[test]
    fn test_counts_emoji_range() {
        let profile = analyze("rocket \u{1F680} and fire \u{1F525}");
        assert_eq!(profile.emojis, 2);
    }

    #[test]
    fn test_score_is_capped_at_one() {
        // Maximize every feature well past its cap.
        let mut doc = String::new();
        for i in 0..600 {
            doc.push_str(&format!(
                "# h{i}\n- item\n`x` [l](u) | a | b |\n```\ncode\n```\n"
            ));
        }
        let profile = analyze(&doc);
        assert!(profile.complexity <= 1.0);
        assert!(profile.complexity >= 0.0);
        assert_eq!(profile.category, Complexity::Complex);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Complexity::from_score(0.29), Complexity::Simple);
        assert_eq!(Complexity::from_score(0.3), Complexity::Moderate);
        assert_eq!(Complexity::from_score(0.69), Complexity::Moderate);
        assert_eq!(Complexity::from_score(0.7), Complexity::Complex);
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let doc = "# Hello\nWorld with \u{1F389}\n";
        let a = analyze(doc);
        let b = analyze(doc);
        assert_eq!(a.complexity, b.complexity);
        assert_eq!(a.category, b.category);
    }
}
