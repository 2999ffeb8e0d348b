use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::decode_share_base64;
use crate::error::DecodeError;
use crate::record::{ProtocolOptions, ProxyRecord, VmessOptions, WsOpts};

/// The loosely-typed JSON carried by a vmess share link. Providers disagree
/// on field types, so `port` and `aid` stay untyped until normalized.
#[derive(Debug, Deserialize, Default)]
struct ShareLink {
    #[serde(default)]
    ps: String,
    #[serde(default)]
    add: String,
    #[serde(default)]
    port: JsonValue,
    #[serde(default)]
    id: String,
    #[serde(default)]
    aid: JsonValue,
    #[serde(default, rename = "type")]
    alg: String,
    #[serde(default)]
    sni: String,
    #[serde(default)]
    tls: String,
    #[serde(default)]
    net: String,
    #[serde(default)]
    path: String,
}

pub(super) fn decode(link: &str) -> Result<ProxyRecord, DecodeError> {
    let body = link.trim_start_matches("vmess://");
    let decoded = decode_share_base64(body)?;
    let share: ShareLink = serde_json::from_slice(&decoded)?;

    let port = normalize_port(&share.port)?;
    let alter_id = normalize_alter_id(&share.aid);
    let tls = share.tls.eq_ignore_ascii_case("tls");
    let servername = (!share.sni.is_empty()).then(|| share.sni.clone());

    let (network, ws_opts) = if share.net == "ws" {
        let path = (!share.path.is_empty()).then(|| share.path.clone());
        (Some(share.net.clone()), Some(WsOpts { path }))
    } else {
        (None, None)
    };

    Ok(ProxyRecord {
        name: share.ps,
        server: share.add,
        port,
        options: ProtocolOptions::Vmess(VmessOptions {
            uuid: share.id,
            alter_id,
            cipher: share.alg,
            udp: true,
            tls,
            servername,
            network,
            ws_opts,
        }),
    })
}

/// Subscription generators emit the port as a string, an integer, or a
/// float; all three must land on the same `u16`.
fn normalize_port(value: &JsonValue) -> Result<u16, DecodeError> {
    let port = match value {
        JsonValue::String(raw) => raw.parse::<f64>().map_err(|_| DecodeError::Port)?,
        JsonValue::Number(number) => number.as_f64().ok_or(DecodeError::Port)?,
        _ => return Err(DecodeError::Port),
    };
    if port.fract() != 0.0 || !(1.0..=65535.0).contains(&port) {
        return Err(DecodeError::Port);
    }
    Ok(port as u16)
}

fn normalize_alter_id(value: &JsonValue) -> u32 {
    match value {
        JsonValue::String(raw) => raw.parse().unwrap_or(0),
        JsonValue::Number(number) => number.as_u64().unwrap_or(0) as u32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn link(json: &serde_json::Value) -> String {
        format!("vmess://{}", STANDARD.encode(json.to_string()))
    }

    #[test]
    fn port_forms_normalize_identically() {
        for port in [
            serde_json::json!("443"),
            serde_json::json!(443),
            serde_json::json!(443.0),
        ] {
            let record = decode(&link(&serde_json::json!({
                "ps": "node",
                "add": "example.com",
                "port": port,
                "id": "123e4567-e89b-12d3-a456-426614174000",
            })))
            .unwrap();
            assert_eq!(record.port, 443);
        }
    }

    #[test]
    fn maps_share_fields_onto_engine_schema() {
        let record = decode(&link(&serde_json::json!({
            "ps": "Tokyo 01",
            "add": "jp.example.com",
            "port": "443",
            "id": "123e4567-e89b-12d3-a456-426614174000",
            "aid": "4",
            "type": "none",
            "sni": "sni.example.com",
            "tls": "TLS",
            "net": "ws",
            "path": "/ws",
        })))
        .unwrap();

        assert_eq!(record.name, "Tokyo 01");
        assert_eq!(record.server, "jp.example.com");
        match record.options {
            ProtocolOptions::Vmess(options) => {
                assert_eq!(options.uuid, "123e4567-e89b-12d3-a456-426614174000");
                assert_eq!(options.alter_id, 4);
                assert_eq!(options.cipher, "none");
                assert_eq!(options.servername.as_deref(), Some("sni.example.com"));
                assert!(options.tls);
                assert!(options.udp);
                assert_eq!(options.network.as_deref(), Some("ws"));
                assert_eq!(
                    options.ws_opts.unwrap().path.as_deref(),
                    Some("/ws")
                );
            }
            other => panic!("expected vmess options, got {}", other.kind()),
        }
    }

    #[test]
    fn non_ws_transport_carries_no_ws_opts() {
        let record = decode(&link(&serde_json::json!({
            "add": "example.com",
            "port": 443,
            "id": "u",
            "net": "tcp",
            "tls": "none",
        })))
        .unwrap();

        match record.options {
            ProtocolOptions::Vmess(options) => {
                assert!(!options.tls);
                assert!(options.network.is_none());
                assert!(options.ws_opts.is_none());
            }
            other => panic!("expected vmess options, got {}", other.kind()),
        }
    }

    #[test]
    fn invalid_base64_fails() {
        assert!(matches!(
            decode("vmess://!!notbase64!!"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn invalid_json_fails() {
        let body = STANDARD.encode("not json at all");
        assert!(matches!(
            decode(&format!("vmess://{body}")),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn missing_port_fails() {
        assert!(matches!(
            decode(&link(&serde_json::json!({"add": "example.com", "id": "u"}))),
            Err(DecodeError::Port)
        ));
    }
}
