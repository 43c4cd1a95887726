//! Orchestrator (component J) — runs one harvest cycle end-to-end, and the
//! scheduled loop that re-invokes it (§4.J).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::stream::{self, StreamExt};
use tokio::time::MissedTickBehavior;

use crate::config::Settings;
use crate::crawl::Crawler;
use crate::dedup;
use crate::extract_text::extract_text;
use crate::fetch;
use crate::packages::PackageSource;
use crate::quality::passes_quality_filter;
use crate::store::DocStore;

pub struct Orchestrator<S: DocStore> {
    settings: Settings,
    store: Arc<S>,
    package_source: PackageSource,
    crawler: Arc<Crawler>,
}

impl<S: DocStore + 'static> Orchestrator<S> {
    pub fn new(settings: Settings, store: Arc<S>) -> anyhow::Result<Self> {
        let package_client = fetch::build_client(&settings.crawler.user_agent)
            .context("building HTTP client for the package source adapter")?;
        let package_source = PackageSource::new(package_client, settings.packages.clone());
        let crawler =
            Arc::new(Crawler::new(settings.crawler.clone()).context("building crawler")?);
        Ok(Self {
            settings,
            store,
            package_source,
            crawler,
        })
    }

    /// One complete harvest cycle: enumerate packages, crawl their
    /// documentation, record raw versions, then extract/filter/dedup and
    /// record the processed survivors (§4.J steps 1-5).
    pub async fn harvest_once(&self) -> anyhow::Result<()> {
        self.store
            .ensure_schema()
            .await
            .context("ensuring store schema")?;

        let package_names = self.package_source.top_package_names().await;
        tracing::info!(count = package_names.len(), "enumerated top packages");

        let mut start_urls: Vec<(i64, String)> = Vec::new();
        for name in &package_names {
            let doc_urls = self.package_source.doc_urls_for_package(name).await;
            if doc_urls.is_empty() {
                tracing::warn!(package = name, "no documentation URLs found");
                continue;
            }

            let package_id = self
                .store
                .upsert_package(name)
                .await
                .context("upserting package")?;

            for url in doc_urls {
                let doc_url_id = self
                    .store
                    .upsert_doc_url(package_id, &url)
                    .await
                    .context("upserting doc url")?;
                start_urls.push((doc_url_id, url));
            }
        }

        let crawl_results: Vec<(i64, crate::crawl::CrawlResult)> = stream::iter(start_urls)
            .map(|(doc_url_id, url)| {
                let crawler = Arc::clone(&self.crawler);
                async move {
                    let pages = crawler.crawl(&url).await;
                    (doc_url_id, pages)
                }
            })
            .buffer_unordered(self.settings.crawler.max_concurrent_crawls)
            .collect()
            .await;

        for (doc_url_id, pages) in crawl_results {
            for (page_url, raw_text) in pages {
                self.store
                    .record_page_version(doc_url_id, &page_url, &raw_text)
                    .await
                    .context("recording page version")?;
            }
        }

        self.process_and_store().await?;

        Ok(())
    }

    /// Step 5: load every stored page version, extract plain text, apply
    /// the Gopher filter, dedup the survivors, and persist processed docs.
    async fn process_and_store(&self) -> anyhow::Result<()> {
        let versions = self
            .store
            .iter_all_page_versions()
            .await
            .context("loading page versions for processing")?;

        let mut candidates: Vec<(i64, String)> = Vec::new();
        for (page_version_id, raw_html) in versions {
            let text = extract_text(&raw_html);
            if passes_quality_filter(&text) {
                candidates.push((page_version_id, text));
            } else {
                tracing::info!(page_version_id, "rejected by quality filter");
            }
        }

        let texts: Vec<String> = candidates.iter().map(|(_, text)| text.clone()).collect();
        let survivors = dedup::survivor_indices(&texts);

        for idx in survivors {
            let (page_version_id, text) = &candidates[idx];
            self.store
                .record_processed(*page_version_id, text)
                .await
                .context("recording processed doc")?;
        }

        Ok(())
    }

    /// Re-invokes [`Orchestrator::harvest_once`] on the configured
    /// `scheduler.interval_minutes` cadence until a shutdown signal arrives
    /// (§4.J). A failed cycle is logged and does not stop the loop — the
    /// next scheduled cycle is the retry mechanism (§4.J, §7).
    pub async fn run_forever(&self) -> anyhow::Result<()> {
        let period = Duration::from_secs(self.settings.scheduler.interval_minutes * 60);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = self.harvest_once().await {
                        tracing::error!(%error, "harvest cycle failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("received shutdown signal, stopping scheduler");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[tokio::test]
    async fn harvest_once_is_a_noop_with_no_configured_package_source() {
        let settings = Settings::default(); // packages.top_packages_url is None
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orchestrator = Orchestrator::new(settings, store.clone()).unwrap();

        orchestrator.harvest_once().await.unwrap();

        let versions = store.iter_all_page_versions().await.unwrap();
        assert!(versions.is_empty());
    }
}
