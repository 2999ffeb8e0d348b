use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::ConvertError;
use crate::model::{GroupKind, ProxyGroup, RoutingDocument};
use crate::record::BatchEntry;

pub const HEALTH_CHECK_URL: &str = "https://api.openai.com";
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MATCH_RULE: &str = "MATCH,all";

/// Combine per-subscription batches into one routing document.
///
/// Every proxy name is rewritten once to `(<subscription>)<name>` so
/// identical display names from different subscriptions cannot collide. The
/// three selection groups and the single default-match rule are emitted
/// unconditionally, even over an empty batch map.
pub fn merge_batches(batches: IndexMap<String, Vec<BatchEntry>>) -> RoutingDocument {
    let mut proxies = Vec::new();
    let mut proxy_names = Vec::new();

    for (subscription, entries) in batches {
        for entry in entries {
            match entry {
                BatchEntry::Record(mut record) => {
                    record.name = namespaced(&subscription, &record.name);
                    match serde_yaml::to_value(&record) {
                        Ok(value) => {
                            proxy_names.push(record.name);
                            proxies.push(value);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, subscription = %subscription, "dropping unserializable proxy record");
                        }
                    }
                }
                BatchEntry::Fragment(value) => match rename_fragment(&subscription, value) {
                    Some((name, value)) => {
                        proxy_names.push(name);
                        proxies.push(value);
                    }
                    None => {
                        tracing::warn!(subscription = %subscription, "dropping proxy entry without a usable name");
                    }
                },
            }
        }
    }

    RoutingDocument {
        proxies,
        proxy_groups: vec![
            ProxyGroup {
                name: "all".to_string(),
                kind: GroupKind::Select,
                proxies: vec!["best".to_string(), "fallback".to_string()],
                url: None,
                interval: None,
            },
            ProxyGroup {
                name: "best".to_string(),
                kind: GroupKind::UrlTest,
                proxies: proxy_names.clone(),
                url: Some(HEALTH_CHECK_URL.to_string()),
                interval: Some(HEALTH_CHECK_INTERVAL_SECS),
            },
            ProxyGroup {
                name: "fallback".to_string(),
                kind: GroupKind::Fallback,
                proxies: proxy_names,
                url: Some(HEALTH_CHECK_URL.to_string()),
                interval: Some(HEALTH_CHECK_INTERVAL_SECS),
            },
        ],
        rules: vec![DEFAULT_MATCH_RULE.to_string()],
    }
}

/// Merge and serialize in one step; a serialization failure means the cycle
/// has no configuration, not an empty one.
pub fn render_merged(batches: IndexMap<String, Vec<BatchEntry>>) -> Result<String, ConvertError> {
    merge_batches(batches).to_yaml_string()
}

fn namespaced(subscription: &str, name: &str) -> String {
    format!("({subscription}){name}")
}

fn rename_fragment(subscription: &str, value: Value) -> Option<(String, Value)> {
    let Value::Mapping(mut map) = value else {
        return None;
    };
    let key = Value::from("name");
    let name = map.get(&key).and_then(Value::as_str).map(str::to_string)?;
    let renamed = namespaced(subscription, &name);
    map.insert(key, Value::from(renamed.clone()));
    Some((renamed, Value::Mapping(map)))
}
