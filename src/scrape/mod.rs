//! Scraping external pages for prompt candidates.
//!
//! With a CSS selector every match becomes one candidate; without one a
//! heuristic sweep over text-bearing elements collects blocks long enough to
//! plausibly be a prompt. Nothing is persisted here — the dashboard lets the
//! user pick candidates and saves them through the normal prompt endpoints.

use std::collections::HashSet;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde::Serialize;

pub const DEFAULT_MIN_LENGTH: usize = 80;
pub const DEFAULT_LIMIT: usize = 20;

/// Elements worth sweeping when no selector is given.
const HEURISTIC_SELECTOR: &str = "pre, blockquote, li, p";

#[derive(Debug, Clone, Serialize)]
pub struct PromptCandidate {
    pub title: String,
    pub content: String,
    pub source_url: String,
}

pub async fn fetch_candidates(
    client: &reqwest::Client,
    url: &str,
    selector: Option<&str>,
    min_length: usize,
    limit: usize,
) -> Result<Vec<PromptCandidate>> {
    let html = client
        .get(url)
        .header("User-Agent", "Mozilla/5.0 (compatible; PromptHive/1.0)")
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("failed to fetch page")?
        .error_for_status()
        .with_context(|| format!("page returned error status: {url}"))?
        .text()
        .await
        .context("failed to read page body")?;

    extract_candidates(&html, url, selector, min_length, limit)
}

fn extract_candidates(
    html: &str,
    url: &str,
    selector: Option<&str>,
    min_length: usize,
    limit: usize,
) -> Result<Vec<PromptCandidate>> {
    let document = Html::parse_document(html);
    let page_title = extract_title(html);

    let css = selector.unwrap_or(HEURISTIC_SELECTOR);
    let sel = Selector::parse(css)
        .map_err(|e| anyhow::anyhow!("invalid selector '{}': {:?}", css, e))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for element in document.select(&sel) {
        let text = element.text().collect::<String>();
        let content = collapse_whitespace(&text);
        // Explicit selectors take whatever matches; the heuristic sweep
        // keeps only blocks long enough to be a prompt.
        let threshold = if selector.is_some() { 1 } else { min_length };
        if content.len() < threshold {
            continue;
        }
        if !seen.insert(content.clone()) {
            continue;
        }

        candidates.push(PromptCandidate {
            title: candidate_title(&content, page_title.as_deref()),
            content,
            source_url: url.to_string(),
        });
        if candidates.len() >= limit {
            break;
        }
    }

    Ok(candidates)
}

fn candidate_title(content: &str, page_title: Option<&str>) -> String {
    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return page_title.unwrap_or("Scraped prompt").to_string();
    }
    if first_line.chars().count() <= 80 {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(77).collect();
    format!("{}...", truncated.trim_end())
}

fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let start = lower.find("<title")?;
    let tag_close = lower[start..].find('>')?;
    let content_start = start + tag_close + 1;
    let end = lower[content_start..].find("</title>")?;
    let title = html[content_start..content_start + end].trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_HTML: &str = r#"
    <html>
    <head><title>Prompt Gallery</title></head>
    <body>
        <p>Short intro.</p>
        <div class="prompt-card">
            <pre>You are a meticulous code reviewer. Given a diff, list correctness issues
first, then style nits, each with the file and line they refer to.</pre>
        </div>
        <div class="prompt-card">
            <pre>Summarize the following article in three bullet points, keeping every
number and named entity intact. Do not editorialize.</pre>
        </div>
        <blockquote>Act as a travel planner and build a three day itinerary for the
city given below, with one museum, one park and one restaurant per day.</blockquote>
        <p>Tiny.</p>
    </body>
    </html>
    "#;

    #[test]
    fn test_heuristic_sweep_skips_short_blocks() {
        let candidates =
            extract_candidates(FIXTURE_HTML, "https://example.com/gallery", None, 80, 20).unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates[0].content.starts_with("You are a meticulous"));
        assert!(candidates.iter().all(|c| c.content.len() >= 80));
        assert!(candidates.iter().all(|c| c.source_url == "https://example.com/gallery"));
    }

    #[test]
    fn test_explicit_selector_takes_matches_verbatim() {
        let candidates = extract_candidates(
            FIXTURE_HTML,
            "https://example.com/gallery",
            Some("div.prompt-card pre"),
            80,
            20,
        )
        .unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[1].content.starts_with("Summarize the following"));
    }

    #[test]
    fn test_limit_applies() {
        let candidates =
            extract_candidates(FIXTURE_HTML, "https://example.com", None, 10, 1).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_duplicate_blocks_deduplicated() {
        let html = r#"<html><body>
            <p>The same long paragraph repeated twice for the deduplication check, padded to length.</p>
            <p>The same long paragraph repeated twice for the deduplication check, padded to length.</p>
        </body></html>"#;
        let candidates = extract_candidates(html, "https://example.com", None, 40, 20).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_invalid_selector() {
        let result =
            extract_candidates(FIXTURE_HTML, "https://example.com", Some("[[[nope"), 10, 20);
        assert!(result.is_err());
    }

    #[test]
    fn test_candidate_title_truncates() {
        let long = "word ".repeat(40);
        let title = candidate_title(&long, None);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= 80);
    }

    #[test]
    fn test_extract_title_basic() {
        assert_eq!(extract_title(FIXTURE_HTML), Some("Prompt Gallery".to_string()));
        assert_eq!(extract_title("<html><body></body></html>"), None);
    }
}
