use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// One normalized proxy entry in the engine's native schema.
///
/// The fields every protocol shares live on the struct; everything else is
/// carried by [`ProtocolOptions`], so a record can only ever hold fields that
/// are valid for its `type`. Serialization flattens the options back into the
/// flat mapping the engine expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyRecord {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(flatten)]
    pub options: ProtocolOptions,
}

/// Protocol-specific payload, tagged with the engine's `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolOptions {
    Ss(SsOptions),
    Ssr(SsrOptions),
    Vmess(VmessOptions),
    Trojan(TrojanOptions),
    Hysteria(HysteriaOptions),
}

impl ProtocolOptions {
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolOptions::Ss(_) => "ss",
            ProtocolOptions::Ssr(_) => "ssr",
            ProtocolOptions::Vmess(_) => "vmess",
            ProtocolOptions::Trojan(_) => "trojan",
            ProtocolOptions::Hysteria(_) => "hysteria",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SsOptions {
    pub cipher: String,
    pub password: String,
    pub udp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(
        rename = "plugin-opts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub plugin_opts: Option<PluginOpts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PluginOpts {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mux: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(
        rename = "skip-cert-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_cert_verify: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SsrOptions {
    pub cipher: String,
    pub password: String,
    pub protocol: String,
    pub obfs: String,
    #[serde(
        rename = "obfs-param",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub obfs_param: Option<String>,
    #[serde(
        rename = "protocol-param",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub protocol_param: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VmessOptions {
    pub uuid: String,
    #[serde(rename = "alterId")]
    pub alter_id: u32,
    pub cipher: String,
    pub udp: bool,
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WsOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrojanOptions {
    pub password: String,
    pub udp: bool,
    #[serde(rename = "skip-cert-verify")]
    pub skip_cert_verify: bool,
    pub sni: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HysteriaOptions {
    #[serde(rename = "auth-str")]
    pub auth_str: String,
    pub obfs: String,
    pub alpn: Vec<String>,
    pub protocol: String,
    pub up: String,
    pub down: String,
    pub sni: String,
    #[serde(rename = "skip-cert-verify")]
    pub skip_cert_verify: bool,
    #[serde(rename = "recv-window-conn")]
    pub recv_window_conn: u64,
    #[serde(rename = "recv-window")]
    pub recv_window: u64,
    pub ca: String,
    #[serde(rename = "ca-str")]
    pub ca_str: String,
    pub disable_mtu_discovery: bool,
    pub fingerprint: String,
    #[serde(rename = "fast-open")]
    pub fast_open: bool,
}

/// One decoded element of a subscription's batch.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    /// Decoded from a share link or a server-directory entry.
    Record(ProxyRecord),
    /// Passed through unmodified from a payload that was already a full
    /// routing document.
    Fragment(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vmess_record_uses_engine_keys() {
        let record = ProxyRecord {
            name: "node".to_string(),
            server: "example.com".to_string(),
            port: 443,
            options: ProtocolOptions::Vmess(VmessOptions {
                uuid: "123e4567-e89b-12d3-a456-426614174000".to_string(),
                alter_id: 0,
                cipher: "none".to_string(),
                udp: true,
                tls: true,
                servername: None,
                network: Some("ws".to_string()),
                ws_opts: Some(WsOpts {
                    path: Some("/ws".to_string()),
                }),
            }),
        };

        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(yaml.contains("type: vmess"));
        assert!(yaml.contains("alterId: 0"));
        assert!(yaml.contains("ws-opts:"));
        assert!(!yaml.contains("alter_id"));
    }

    #[test]
    fn trojan_record_uses_engine_keys() {
        let record = ProxyRecord {
            name: "node".to_string(),
            server: "example.com".to_string(),
            port: 443,
            options: ProtocolOptions::Trojan(TrojanOptions {
                password: "secret".to_string(),
                udp: true,
                skip_cert_verify: true,
                sni: String::new(),
            }),
        };

        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(yaml.contains("type: trojan"));
        assert!(yaml.contains("skip-cert-verify: true"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let record = ProxyRecord {
            name: "node".to_string(),
            server: "example.com".to_string(),
            port: 8388,
            options: ProtocolOptions::Ss(SsOptions {
                cipher: "aes-256-gcm".to_string(),
                password: "secret".to_string(),
                udp: true,
                plugin: None,
                plugin_opts: None,
            }),
        };

        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(!yaml.contains("plugin"));
    }
}
