use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{ActivityDetails, Plan};

/// Links probed per list; the rest are dropped.
pub const MAX_LINKS_PER_LIST: usize = 5;
/// Probes in flight at once.
pub const PROBE_CONCURRENCY: usize = 5;

const HEAD_TIMEOUT: Duration = Duration::from_secs(3);
const GET_TIMEOUT: Duration = Duration::from_secs(2);
const PASS_TIMEOUT: Duration = Duration::from_secs(30);

/// Liveness check for a single URL.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probes with `HEAD`, falling back to `GET` when the `HEAD` request errors.
#[derive(Clone, Debug)]
pub struct HttpLinkProbe {
    client: reqwest::Client,
}

impl HttpLinkProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpLinkProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        let head = self
            .client
            .head(url)
            .header("User-Agent", "Mozilla/5.0")
            .timeout(HEAD_TIMEOUT)
            .send()
            .await;

        match head {
            Ok(response) => response.status().as_u16() < 400,
            Err(err) => {
                debug!(url, error = %err, "HEAD failed, retrying with GET");
                // The body is never read; only the status line matters.
                self.client
                    .get(url)
                    .header("User-Agent", "Mozilla/5.0")
                    .timeout(GET_TIMEOUT)
                    .send()
                    .await
                    .map(|response| response.status().as_u16() < 400)
                    .unwrap_or(false)
            }
        }
    }
}

/// Absolute `http`/`https` URL with a host.
pub fn is_well_formed(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        })
        .unwrap_or(false)
}

/// Drops malformed or dead links from structured results.
#[derive(Clone)]
pub struct SourceValidator {
    probe: Arc<dyn LinkProbe>,
    pass_timeout: Duration,
}

impl SourceValidator {
    pub fn new(probe: Arc<dyn LinkProbe>) -> Self {
        Self {
            probe,
            pass_timeout: PASS_TIMEOUT,
        }
    }

    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    /// Keep the live, well-formed links among the first few, in order.
    pub async fn filter_links(&self, links: &[String]) -> Vec<String> {
        let candidates: Vec<String> = links
            .iter()
            .take(MAX_LINKS_PER_LIST)
            .filter(|link| is_well_formed(link))
            .cloned()
            .collect();

        let probe = &self.probe;
        let checked: Vec<(String, bool)> = stream::iter(candidates)
            .map(|link| async move {
                let alive = probe.is_reachable(&link).await;
                (link, alive)
            })
            .buffered(PROBE_CONCURRENCY)
            .collect()
            .await;

        checked
            .into_iter()
            .filter_map(|(link, alive)| alive.then_some(link))
            .collect()
    }

    async fn filter_details(&self, details: &mut ActivityDetails) {
        if !details.sources.is_empty() {
            details.sources = self.filter_links(&details.sources).await;
        }
        if !details.official_links.is_empty() {
            details.official_links = self.filter_links(&details.official_links).await;
        }
    }

    /// Filter every link list in a plan.
    ///
    /// Works on a copy; if the pass overruns its time bound the plan is
    /// returned untouched.
    pub async fn validate_plan(&self, plan: Plan) -> Plan {
        let mut filtered = plan.clone();
        let pass = async {
            if !filtered.sources.is_empty() {
                filtered.sources = self.filter_links(&filtered.sources).await;
            }
            if !filtered.official_links.is_empty() {
                filtered.official_links = self.filter_links(&filtered.official_links).await;
            }
            for day in filtered.itinerary.iter_mut() {
                for activity in day.activities.iter_mut() {
                    self.filter_details(&mut activity.details).await;
                }
            }
        };

        match tokio::time::timeout(self.pass_timeout, pass).await {
            Ok(()) => {
                info!(plan_id = %plan.plan_id, "source validation complete");
                filtered
            }
            Err(_) => {
                warn!(plan_id = %plan.plan_id, "source validation timed out; keeping links as generated");
                plan
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct AllowList(HashSet<String>);

    #[async_trait]
    impl LinkProbe for AllowList {
        async fn is_reachable(&self, url: &str) -> bool {
            self.0.contains(url)
        }
    }

    fn validator(alive: &[&str]) -> SourceValidator {
        let allow = alive.iter().map(|url| url.to_string()).collect();
        SourceValidator::new(Arc::new(AllowList(allow)))
    }

    #[test]
    fn test_well_formed_urls() {
        assert!(is_well_formed("https://www.visitlisboa.com/en"));
        assert!(is_well_formed("http://example.org"));
        assert!(!is_well_formed("ftp://example.org/file"));
        assert!(!is_well_formed("www.example.org"));
        assert!(!is_well_formed("https://"));
        assert!(!is_well_formed(""));
    }

    #[tokio::test]
    async fn test_filter_keeps_order_and_drops_dead_links() {
        let validator = validator(&["https://a.example.com", "https://c.example.com"]);
        let links = vec![
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
            "not a url".to_string(),
            "https://c.example.com".to_string(),
        ];

        let kept = validator.filter_links(&links).await;

        assert_eq!(
            kept,
            vec![
                "https://a.example.com".to_string(),
                "https://c.example.com".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_only_first_links_are_considered() {
        let links: Vec<String> = (0..8)
            .map(|idx| format!("https://site{idx}.example.com"))
            .collect();
        let alive: Vec<&str> = links.iter().map(String::as_str).collect();
        let validator = validator(&alive);

        let kept = validator.filter_links(&links).await;

        assert_eq!(kept.len(), MAX_LINKS_PER_LIST);
        assert_eq!(kept[0], "https://site0.example.com");
    }

    #[tokio::test]
    async fn test_http_probe_against_local_server() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("HEAD", "/open")
            .with_status(200)
            .create_async()
            .await;
        let _gone = server
            .mock("HEAD", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let probe = HttpLinkProbe::new();
        assert!(probe.is_reachable(&format!("{}/open", server.url())).await);
        assert!(!probe.is_reachable(&format!("{}/gone", server.url())).await);
    }
}
