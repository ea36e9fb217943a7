use std::{fs, path::Path};

use anyhow::Context;
use client_core::{credentials::DEFAULT_TOKEN_PATH, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use shared::protocol::{BaseQuery, DimensionSelection, MetricSelection, TimeRange};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub graphql_endpoint: String,
    pub token_host: Option<String>,
    pub token_path: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub base_query: BaseQuery,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphql_endpoint: "http://127.0.0.1:4000/graphql".into(),
            token_host: None,
            token_path: DEFAULT_TOKEN_PATH.into(),
            client_id: None,
            client_secret: None,
            access_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            base_query: BaseQuery::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Static(String),
    ClientCredentials {
        token_host: String,
        token_path: String,
        client_id: String,
        client_secret: String,
    },
    Missing,
}

impl Settings {
    pub fn graphql_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.graphql_endpoint)
            .with_context(|| format!("invalid graphql endpoint '{}'", self.graphql_endpoint))
    }

    /// A static token wins over client credentials.
    pub fn credential_source(&self) -> CredentialSource {
        if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_empty()) {
            return CredentialSource::Static(token.clone());
        }
        match (&self.token_host, &self.client_id, &self.client_secret) {
            (Some(token_host), Some(client_id), Some(client_secret)) => {
                CredentialSource::ClientCredentials {
                    token_host: token_host.clone(),
                    token_path: self.token_path.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                }
            }
            _ => CredentialSource::Missing,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileDimension {
    column_name: String,
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    graphql_endpoint: Option<String>,
    token_host: Option<String>,
    token_path: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    access_token: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    time_range: Option<String>,
    metrics: Option<Vec<String>>,
    dimensions: Option<Vec<FileDimension>>,
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!("config: ignoring unreadable {}: {err}", path.display()),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.graphql_endpoint {
        settings.graphql_endpoint = v;
    }
    if let Some(v) = file_cfg.token_host {
        settings.token_host = Some(v);
    }
    if let Some(v) = file_cfg.token_path {
        settings.token_path = v;
    }
    if let Some(v) = file_cfg.client_id {
        settings.client_id = Some(v);
    }
    if let Some(v) = file_cfg.client_secret {
        settings.client_secret = Some(v);
    }
    if let Some(v) = file_cfg.access_token {
        settings.access_token = Some(v);
    }
    if let Some(v) = file_cfg.page_size {
        set_page_size(settings, v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.time_range {
        settings.base_query.time_range = TimeRange { relative: v };
    }
    if let Some(metrics) = file_cfg.metrics {
        settings.base_query.metrics = metrics
            .into_iter()
            .map(|unique_name| MetricSelection { unique_name })
            .collect();
    }
    if let Some(dimensions) = file_cfg.dimensions {
        settings.base_query.dimensions = dimensions
            .into_iter()
            .map(|d| DimensionSelection {
                column_name: d.column_name,
                display_name: d.display_name,
            })
            .collect();
    }
}

/// Reads `NAME` then `APP__NAME`, so the prefixed variable wins.
fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    let prefixed = lookup(&format!("APP__{name}"));
    prefixed.or_else(|| lookup(name))
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env_value(&lookup, "GRAPHQL_ENDPOINT") {
        settings.graphql_endpoint = v;
    }
    if let Some(v) = env_value(&lookup, "TOKEN_HOST") {
        settings.token_host = Some(v);
    }
    if let Some(v) = env_value(&lookup, "TOKEN_PATH") {
        settings.token_path = v;
    }
    if let Some(v) = env_value(&lookup, "CLIENT_ID") {
        settings.client_id = Some(v);
    }
    if let Some(v) = env_value(&lookup, "CLIENT_SECRET") {
        settings.client_secret = Some(v);
    }
    if let Some(v) = env_value(&lookup, "ACCESS_TOKEN") {
        settings.access_token = Some(v);
    }
    if let Some(v) = env_value(&lookup, "PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) => set_page_size(settings, parsed),
            Err(_) => warn!("config: ignoring non-numeric PAGE_SIZE={v}"),
        }
    }
    if let Some(v) = env_value(&lookup, "REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = env_value(&lookup, "TIME_RANGE") {
        settings.base_query.time_range = TimeRange { relative: v };
    }
}

pub fn set_page_size(settings: &mut Settings, page_size: u32) {
    if page_size == 0 {
        warn!("config: page size must be at least 1, keeping {}", settings.page_size);
        return;
    }
    settings.page_size = page_size;
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
