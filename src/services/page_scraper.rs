use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::types::PageDetails;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const PRICE_WINDOW: usize = 1000;
const HOURS_WINDOW: usize = 2000;
const MAX_MATCHES: usize = 3;

struct Patterns {
    blocks: Regex,
    tags: Regex,
    spaces: Regex,
    prices: [Regex; 4],
    hours: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        blocks: Regex::new(r"(?is)<(?:script|style)[^>]*>.*?</(?:script|style)>")
            .expect("script block pattern"),
        tags: Regex::new(r"<[^>]*>").expect("tag pattern"),
        spaces: Regex::new(r"\s+").expect("whitespace pattern"),
        prices: [
            Regex::new(r"\$\d+").expect("dollar pattern"),
            Regex::new(r"€\d+").expect("euro pattern"),
            Regex::new(r"£\d+").expect("pound pattern"),
            Regex::new(r"\d+\s*USD").expect("usd pattern"),
        ],
        hours: Regex::new(r"\d{1,2}:\d{2}\s*(?:AM|PM|am|pm)").expect("clock pattern"),
    })
}

/// Visible text of an HTML document, whitespace collapsed.
pub fn visible_text(html: &str) -> String {
    let patterns = patterns();
    let without_blocks = patterns.blocks.replace_all(html, " ");
    let without_tags = patterns.tags.replace_all(&without_blocks, " ");
    patterns
        .spaces
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

fn leading(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Price and clock-time snippets from the start of a page.
pub fn extract_page_details(html: &str, source_url: &str) -> PageDetails {
    let patterns = patterns();
    let text = visible_text(html);

    let price_text = leading(&text, PRICE_WINDOW);
    let found_prices = patterns
        .prices
        .iter()
        .flat_map(|pattern| pattern.find_iter(price_text).map(|m| m.as_str().to_string()))
        .take(MAX_MATCHES)
        .collect();

    let found_hours = patterns
        .hours
        .find_iter(leading(&text, HOURS_WINDOW))
        .map(|m| m.as_str().to_string())
        .take(MAX_MATCHES)
        .collect();

    PageDetails {
        found_prices,
        found_hours,
        source_url: source_url.to_string(),
    }
}

/// Best-effort fetch of supplementary details from a linked page.
#[derive(Clone, Debug)]
pub struct PageScraper {
    client: Client,
}

impl PageScraper {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn fetch_details(&self, url: &str) -> Result<PageDetails> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "Mozilla/5.0")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|err| PlannerError::Http(format!("Failed to fetch {url}: {err}")))?;

        let body = response
            .text()
            .await
            .map_err(|err| PlannerError::Http(format!("Failed to read {url}: {err}")))?;

        let details = extract_page_details(&body, url);
        debug!(
            url,
            prices = details.found_prices.len(),
            hours = details.found_hours.len(),
            "page details extracted"
        );
        Ok(details)
    }
}

impl Default for PageScraper {
    fn default() -> Self {
        Self::new()
    }
}
