//! Robots Gate (component B) — decide whether a URL may be fetched.

use std::time::Duration;

use reqwest::Client;
use robotstxt::DefaultMatcher;
use url::Url;

/// An absent body (empty string) stands in for "fetched but unavailable" —
/// robots.txt 404s, non-UTF8 bodies, and transport errors are all cached as
/// `""` (which `DefaultMatcher` treats as allow-all) so a bad host isn't
/// refetched on every URL in the cycle.
///
/// Scoped to the lifetime of one [`RobotsGate`] (in turn scoped to one
/// [`crate::crawl::Crawler`] instance, per the Open Question decision
/// recorded in DESIGN.md) — entries expire after the cycle would reasonably
/// be over so a long-running scheduler doesn't serve stale robots.txt forever.
pub struct RobotsGate {
    client: Client,
    cache: moka::future::Cache<String, String>,
}

impl RobotsGate {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: moka::future::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(60 * 60))
                .build(),
        }
    }

    /// `can_fetch(user_agent, url)` — §4.B. Fetch failures default to
    /// allowed and are the caller's responsibility to log; this returns
    /// `true` in that case so the crawl proceeds.
    pub async fn can_fetch(&self, user_agent: &str, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h.to_string(),
            None => return true,
        };
        let body = self.robots_body_for_host(url, &host).await;
        if body.is_empty() {
            return true;
        }
        DefaultMatcher::default().one_agent_allowed_by_robots(&body, user_agent, url.as_str())
    }

    async fn robots_body_for_host(&self, url: &Url, host: &str) -> String {
        let client = self.client.clone();
        let port_suffix = url
            .port()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        let origin = format!("{}://{host}{port_suffix}", url.scheme());
        let robots_url = format!("{origin}/robots.txt");
        self.cache
            .get_with(origin, async move {
                match client.get(&robots_url).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        resp.text().await.unwrap_or_default()
                    }
                    _ => String::new(),
                }
            })
            .await
    }
}
