//! Package Source Adapter (component K) — enumerate packages and extract
//! candidate documentation URLs from PyPI metadata.

use std::collections::HashSet;

use reqwest::Client;
use serde::Deserialize;

use crate::config::PackagesSettings;

#[derive(Debug, Deserialize)]
struct TopPackagesEntry {
    project: String,
}

#[derive(Debug, Deserialize)]
struct TopPackagesResponse {
    rows: Vec<TopPackagesEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageInfoResponse {
    info: PackageInfo,
}

#[derive(Debug, Deserialize, Default)]
struct PackageInfo {
    docs_url: Option<String>,
    home_page: Option<String>,
    #[serde(default)]
    project_urls: Option<std::collections::HashMap<String, String>>,
}

pub struct PackageSource {
    client: Client,
    settings: PackagesSettings,
}

impl PackageSource {
    pub fn new(client: Client, settings: PackagesSettings) -> Self {
        Self { client, settings }
    }

    /// GETs the configured top-packages listing and returns the first
    /// `top_n` project names. A missing `top_packages_url` or a transport/
    /// parse failure yields an empty list and is the caller's
    /// responsibility to log (§4.K "Unreachable packages").
    pub async fn top_package_names(&self) -> Vec<String> {
        if !self.is_supported_source() {
            tracing::error!(
                source = self.settings.source,
                "unsupported package source, only 'pypi' is recognized"
            );
            return Vec::new();
        }

        let Some(url) = &self.settings.top_packages_url else {
            tracing::warn!("packages.top_packages_url is not configured, nothing to harvest");
            return Vec::new();
        };

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(error) => {
                tracing::warn!(%error, url, "failed to fetch top packages listing");
                return Vec::new();
            }
        };

        let parsed: TopPackagesResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(%error, url, "failed to parse top packages listing");
                return Vec::new();
            }
        };

        parsed
            .rows
            .into_iter()
            .take(self.settings.top_n)
            .map(|entry| entry.project)
            .collect()
    }

    /// GETs `<index>/<pkg>/json` and collects candidate documentation URLs
    /// from `docs_url`, matching `project_urls` entries, and `home_page`
    /// (§4.K). Unreachable packages yield an empty set.
    pub async fn doc_urls_for_package(&self, package_name: &str) -> HashSet<String> {
        if !self.is_supported_source() {
            tracing::error!(
                source = self.settings.source,
                package_name,
                "unsupported package source, only 'pypi' is recognized"
            );
            return HashSet::new();
        }

        let url = format!("https://pypi.org/pypi/{package_name}/json");
        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(error) => {
                tracing::warn!(%error, package_name, "failed to fetch package metadata");
                return HashSet::new();
            }
        };

        let parsed: PackageInfoResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(%error, package_name, "failed to parse package metadata");
                return HashSet::new();
            }
        };

        extract_doc_urls(&parsed.info)
    }

    /// §4.K / §6: "Only `\"pypi\"` is recognized in this design" — mirrors
    /// the original adapter's explicit source check rather than silently
    /// treating every configured source as PyPI.
    fn is_supported_source(&self) -> bool {
        self.settings.source.eq_ignore_ascii_case("pypi")
    }
}

fn extract_doc_urls(info: &PackageInfo) -> HashSet<String> {
    let mut urls = HashSet::new();

    if let Some(docs_url) = &info.docs_url {
        if !docs_url.is_empty() {
            urls.insert(docs_url.clone());
        }
    }

    if let Some(project_urls) = &info.project_urls {
        for (key, value) in project_urls {
            if key.to_lowercase().contains("doc") || value.to_lowercase().contains("readthedocs")
            {
                urls.insert(value.clone());
            }
        }
    }

    if let Some(home_page) = &info.home_page {
        let lower = home_page.to_lowercase();
        if lower.contains("docs") || lower.contains("readthedocs") {
            urls.insert(home_page.clone());
        }
    }

    urls
}
