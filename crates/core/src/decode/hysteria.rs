use std::collections::HashMap;

use url::Url;

use super::{percent_decode, require_port};
use crate::error::DecodeError;
use crate::record::{HysteriaOptions, ProtocolOptions, ProxyRecord};

/// `hysteria://host:port?protocol=udp&auth=...&peer=...&insecure=1&...#name`
///
/// Query values are tolerated loosely: absent or unparsable numbers and
/// booleans fall back to their zero values.
pub(super) fn decode(link: &str) -> Result<ProxyRecord, DecodeError> {
    let url = Url::parse(link)?;
    let server = url
        .host_str()
        .ok_or(DecodeError::Malformed("missing host"))?
        .to_string();
    let port = require_port(&url)?;
    let name = percent_decode(url.fragment().unwrap_or_default())?;

    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let get = |key: &str| query.get(key).cloned().unwrap_or_default();

    let alpn = match query.get("alpn") {
        Some(value) if !value.is_empty() => vec![value.clone()],
        _ => Vec::new(),
    };

    Ok(ProxyRecord {
        name,
        server,
        port,
        options: ProtocolOptions::Hysteria(HysteriaOptions {
            auth_str: get("auth"),
            obfs: get("obfs"),
            alpn,
            protocol: get("protocol"),
            up: get("upmbps"),
            down: get("downmbps"),
            sni: get("peer"),
            skip_cert_verify: loose_bool(&get("insecure")),
            recv_window_conn: loose_u64(&get("recv-window-conn")),
            recv_window: loose_u64(&get("recv-window")),
            ca: get("ca"),
            ca_str: get("ca-str"),
            disable_mtu_discovery: loose_bool(&get("disable_mtu_discovery")),
            fingerprint: get("fingerprint"),
            fast_open: loose_bool(&get("fast-open")),
        }),
    })
}

fn loose_bool(raw: &str) -> bool {
    matches!(raw, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

fn loose_u64(raw: &str) -> u64 {
    raw.parse().unwrap_or_default()
}
