use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::Instrument;

mod payload;
pub use payload::{parse_link_lines, parse_payload};

use crate::decode::DecoderRegistry;
use crate::error::FetchError;
use crate::record::BatchEntry;

/// A named, periodically refreshed source of proxy entries, backed by a
/// remote URL or a local file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Subscription {
    /// Fill in a usable name when the source did not provide one.
    pub fn ensure_name(&mut self) {
        if self.name.is_empty() {
            self.name = self
                .url
                .clone()
                .or_else(|| self.path.as_ref().map(|p| p.display().to_string()))
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        }
    }

    /// Retrieve, unwrap, and decode this subscription's payload into a batch.
    pub async fn load_entries(
        &mut self,
        client: &Client,
        registry: &DecoderRegistry,
    ) -> Result<Vec<BatchEntry>, FetchError> {
        self.ensure_name();

        let raw = match (&self.url, &self.path) {
            (Some(url), _) => {
                let span = tracing::info_span!("fetch_subscription", name = %self.name, url = %url);
                fetch_payload(client, url).instrument(span).await?
            }
            (None, Some(path)) => {
                fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::File {
                        path: path.clone(),
                        source,
                    })?
            }
            _ => return Err(FetchError::MissingSource(self.name.clone())),
        };

        self.last_updated = Some(Utc::now());

        let payload = unwrap_transport_base64(&raw);
        Ok(parse_payload(&payload, registry))
    }
}

/// Retrieve one subscription body over HTTP; anything but a success status
/// is a failure.
pub async fn fetch_payload(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(30))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(response.text().await?)
}

/// Providers commonly base64-wrap the whole line-delimited body. Unwrap when
/// the body decodes cleanly to text; otherwise the body is used as-is.
pub fn unwrap_transport_base64(raw: &str) -> String {
    let filtered: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if filtered.is_empty() {
        return raw.to_string();
    }
    let mut padded = filtered;
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    match STANDARD.decode(&padded) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}

/// What to do when one subscription fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the subscriptions that loaded and drop the ones that failed.
    #[default]
    Skip,
    /// Abandon the whole cycle on the first failing subscription.
    Abort,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "unknown failure policy {other:?} (expected skip or abort)"
            )),
        }
    }
}

/// Load every enabled subscription in order, keying each batch by name.
///
/// Subscriptions are processed strictly sequentially; the returned map is
/// complete before any merging happens.
pub async fn collect_batches(
    client: &Client,
    subscriptions: &mut [Subscription],
    registry: &DecoderRegistry,
    policy: FailurePolicy,
) -> Result<IndexMap<String, Vec<BatchEntry>>, FetchError> {
    let mut batches = IndexMap::new();
    for subscription in subscriptions.iter_mut() {
        if !subscription.enabled {
            continue;
        }
        match subscription.load_entries(client, registry).await {
            Ok(entries) => {
                batches.insert(subscription.name.clone(), entries);
            }
            Err(err) => match policy {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::Skip => {
                    tracing::error!(name = %subscription.name, error = %err, "skipping subscription");
                }
            },
        }
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_links_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn file_subscription(name: &str, path: PathBuf) -> Subscription {
        Subscription {
            name: name.to_string(),
            url: None,
            path: Some(path),
            enabled: true,
            last_updated: None,
        }
    }

    fn ss_link(name: &str) -> String {
        let userinfo = STANDARD.encode("aes-256-gcm:pw");
        format!("ss://{userinfo}@example.com:8388#{name}")
    }

    #[test]
    fn transport_base64_is_unwrapped() {
        let body = ss_link("a");
        let wrapped = STANDARD.encode(&body);
        assert_eq!(unwrap_transport_base64(&wrapped), body);
    }

    #[test]
    fn transport_base64_tolerates_line_breaks_and_padding_loss() {
        let body = format!("{}\n{}", ss_link("a"), ss_link("b"));
        let wrapped = STANDARD.encode(&body);
        let mangled = format!(
            "{}\n{}",
            &wrapped[..10],
            wrapped[10..].trim_end_matches('=')
        );
        assert_eq!(unwrap_transport_base64(&mangled), body);
    }

    #[test]
    fn non_base64_body_passes_through() {
        let body = "proxies:\n  - { name: a }\n";
        assert_eq!(unwrap_transport_base64(body), body);
    }

    #[tokio::test]
    async fn loads_entries_from_local_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_links_file(
            &dir,
            "links.txt",
            &format!("{}\n{}\n", ss_link("a"), ss_link("b")),
        );

        let mut subscription = file_subscription("local", path);
        let registry = DecoderRegistry::with_defaults();
        let entries = subscription
            .load_entries(&Client::new(), &registry)
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert!(subscription.last_updated.is_some());
    }

    #[tokio::test]
    async fn skip_policy_drops_only_the_failing_subscription() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = write_links_file(&dir, "good.txt", &ss_link("a"));

        let mut subscriptions = vec![
            file_subscription("broken", dir.path().join("missing.txt")),
            file_subscription("good", good),
        ];

        let registry = DecoderRegistry::with_defaults();
        let batches = collect_batches(
            &Client::new(),
            &mut subscriptions,
            &registry,
            FailurePolicy::Skip,
        )
        .await
        .unwrap();

        assert_eq!(batches.len(), 1);
        assert!(batches.contains_key("good"));
    }

    #[tokio::test]
    async fn abort_policy_fails_the_whole_cycle() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = write_links_file(&dir, "good.txt", &ss_link("a"));

        let mut subscriptions = vec![
            file_subscription("broken", dir.path().join("missing.txt")),
            file_subscription("good", good),
        ];

        let registry = DecoderRegistry::with_defaults();
        let result = collect_batches(
            &Client::new(),
            &mut subscriptions,
            &registry,
            FailurePolicy::Abort,
        )
        .await;

        assert!(matches!(result, Err(FetchError::File { .. })));
    }

    #[tokio::test]
    async fn disabled_subscriptions_are_not_loaded() {
        let mut subscriptions = vec![Subscription {
            enabled: false,
            ..file_subscription("off", PathBuf::from("/nonexistent"))
        }];

        let registry = DecoderRegistry::with_defaults();
        let batches = collect_batches(
            &Client::new(),
            &mut subscriptions,
            &registry,
            FailurePolicy::Abort,
        )
        .await
        .unwrap();

        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let mut subscription = Subscription {
            name: "empty".to_string(),
            url: None,
            path: None,
            enabled: true,
            last_updated: None,
        };
        let registry = DecoderRegistry::with_defaults();
        let result = subscription.load_entries(&Client::new(), &registry).await;
        assert!(matches!(result, Err(FetchError::MissingSource(_))));
    }
}
