//! Crawler (component E) — bounded BFS with robots compliance and a
//! per-fetch politeness delay.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::Client;
use tokio::time::sleep;
use url::Url;

use crate::config::CrawlerSettings;
use crate::fetch;
use crate::links::extract_links;
use crate::robots::RobotsGate;

/// One `crawl(start_url)` invocation's result: `page_url -> raw_text`,
/// in BFS discovery order (an ordered map so scenario S1/S2 style
/// assertions about order are meaningful).
pub type CrawlResult = IndexMap<String, String>;

pub struct Crawler {
    settings: CrawlerSettings,
    client: Client,
    robots: RobotsGate,
}

impl Crawler {
    pub fn new(settings: CrawlerSettings) -> reqwest::Result<Self> {
        let client = fetch::build_client(&settings.user_agent)?;
        let robots = RobotsGate::new(client.clone());
        Ok(Self {
            settings,
            client,
            robots,
        })
    }

    /// Runs the bounded BFS described in §4.E and returns the page map.
    /// This never errors: every per-URL failure is logged and the URL is
    /// simply absent from the result (§4.E "Failure semantics").
    pub async fn crawl(&self, start_url: &str) -> CrawlResult {
        let mut result: CrawlResult = IndexMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((start_url.to_string(), 0));

        let mut pages_explored = 0usize;

        while let Some((url_str, depth)) = queue.pop_front() {
            if pages_explored >= self.settings.max_pages {
                break;
            }
            if visited.contains(&url_str) || depth > self.settings.max_depth {
                continue;
            }

            pages_explored += 1;
            visited.insert(url_str.clone());

            let url = match Url::parse(&url_str) {
                Ok(u) => u,
                Err(error) => {
                    tracing::warn!(url = %url_str, %error, "could not parse URL, skipping");
                    continue;
                }
            };

            if !self.robots.can_fetch(&self.settings.user_agent, &url).await {
                tracing::info!(url = %url_str, "disallowed by robots.txt, skipping");
                continue;
            }

            let page = match fetch::fetch(&self.client, url.as_str()).await {
                Ok(page) => page,
                Err(error) => {
                    tracing::warn!(url = %url_str, %error, "fetch failed, skipping");
                    continue;
                }
            };

            result.insert(url_str.clone(), page.body.clone());

            sleep(Duration::from_secs(self.settings.request_delay_secs)).await;

            if depth < self.settings.max_depth {
                for link in extract_links(&page.body, &url) {
                    let link_str = link.to_string();
                    if !result.contains_key(&link_str) {
                        queue.push_back((link_str, depth + 1));
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> CrawlerSettings {
        CrawlerSettings {
            user_agent: "TestBot".to_string(),
            max_depth: 1,
            max_pages: 10,
            request_delay_secs: 0,
            max_concurrent_crawls: 8,
        }
    }

    async fn allow_all_robots(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn bfs_discovers_linked_pages_within_depth() {
        let server = MockServer::start().await;
        allow_all_robots(&server).await;

        let page_a = format!(
            r#"<a href="/b">b</a><a href="/c">c</a><a href="{}/x">x</a>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_a))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b page"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("c page"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x page"))
            .mount(&server)
            .await;

        let crawler = Crawler::new(settings()).unwrap();
        let result = crawler.crawl(&format!("{}/a", server.uri())).await;

        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0], &format!("{}/a", server.uri()));
    }

    #[tokio::test]
    async fn respects_max_pages_cap() {
        let server = MockServer::start().await;
        allow_all_robots(&server).await;

        let page_a = r#"<a href="/b">b</a><a href="/c">c</a>"#;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_a))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("c"))
            .mount(&server)
            .await;

        let mut s = settings();
        s.max_pages = 2;
        let crawler = Crawler::new(s).unwrap();
        let result = crawler.crawl(&format!("{}/a", server.uri())).await;

        assert_eq!(result.len(), 2);
        assert!(result.contains_key(&format!("{}/a", server.uri())));
    }

    #[tokio::test]
    async fn failed_fetch_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        allow_all_robots(&server).await;

        let page_a = r#"<a href="/b">b</a><a href="/c">c</a>"#;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_a))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("c"))
            .mount(&server)
            .await;

        let crawler = Crawler::new(settings()).unwrap();
        let result = crawler.crawl(&format!("{}/a", server.uri())).await;

        assert!(result.contains_key(&format!("{}/a", server.uri())));
        assert!(!result.contains_key(&format!("{}/b", server.uri())));
        assert!(result.contains_key(&format!("{}/c", server.uri())));
    }

    #[tokio::test]
    async fn depth_cap_prevents_grandchild_enqueue() {
        let server = MockServer::start().await;
        allow_all_robots(&server).await;

        let page_a = r#"<a href="/b">b</a>"#;
        let page_b = r#"<a href="/d">d</a>"#;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_a))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_b))
            .mount(&server)
            .await;

        let mut s = settings();
        s.max_depth = 1;
        let crawler = Crawler::new(s).unwrap();
        let result = crawler.crawl(&format!("{}/a", server.uri())).await;

        assert_eq!(result.len(), 2);
        assert!(!result.contains_key(&format!("{}/d", server.uri())));
    }
}
