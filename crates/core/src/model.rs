use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConvertError;

/// The merged output document: exactly three top-level sequences, consumed by
/// the downstream engine's non-negotiable schema.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoutingDocument {
    #[serde(default)]
    pub proxies: Vec<Value>,

    #[serde(rename = "proxy-groups", default)]
    pub proxy_groups: Vec<ProxyGroup>,

    #[serde(default)]
    pub rules: Vec<String>,
}

impl RoutingDocument {
    pub fn to_yaml_string(&self) -> Result<String, ConvertError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn proxy_names(&self) -> Vec<String> {
        self.proxies
            .iter()
            .filter_map(|proxy| match proxy {
                Value::Mapping(map) => map
                    .get(Value::from("name"))
                    .and_then(|value| value.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            })
            .collect()
    }
}

/// A named, typed collection of proxies or other groups.
///
/// `url`/`interval` are present only for the health-checked kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyGroup {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: GroupKind,

    pub proxies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    Select,
    UrlTest,
    Fallback,
}
