use super::{decode_share_base64, decode_share_text};
use crate::error::DecodeError;
use crate::record::{ProtocolOptions, ProxyRecord, SsOptions, SsrOptions};

/// Ciphers the plain-ss engine type also understands; an ssr link using one
/// of these with `origin`/`plain` is downgraded to an ss record.
const SS_COMPATIBLE_CIPHERS: &[&str] = &[
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
    "rc4-md5",
    "chacha20",
    "chacha20-ietf",
    "xchacha20",
    "chacha20-ietf-poly1305",
    "xchacha20-ietf-poly1305",
];

/// `ssr://base64(server:port:protocol:cipher:obfs:password-b64/?query)`
/// where every query value is itself base64.
pub(super) fn decode(link: &str) -> Result<ProxyRecord, DecodeError> {
    let body = link.trim_start_matches("ssr://");
    let decoded = decode_share_base64(body)?;
    let text = String::from_utf8(decoded).map_err(|_| DecodeError::Utf8)?;

    let fields: Vec<&str> = text.split(':').collect();
    let &[server, port_raw, protocol, cipher, obfs, suffix] = fields.as_slice() else {
        return Err(DecodeError::Malformed("expected six colon-delimited fields"));
    };
    let port: u16 = port_raw
        .parse()
        .ok()
        .filter(|port| *port > 0)
        .ok_or(DecodeError::Port)?;

    let (password_b64, query) = suffix
        .split_once("/?")
        .ok_or(DecodeError::Malformed("missing password/query suffix"))?;
    let password = decode_share_text(password_b64)?;

    let mut name = String::new();
    let mut obfs_param = None;
    let mut protocol_param = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = decode_share_text(&value)?;
        match key.as_ref() {
            "obfsparam" => obfs_param = Some(value),
            "protoparam" => protocol_param = Some(value),
            "remarks" => name = value,
            _ => {}
        }
    }

    let options = if protocol == "origin" && obfs == "plain" && SS_COMPATIBLE_CIPHERS.contains(&cipher)
    {
        ProtocolOptions::Ss(SsOptions {
            cipher: cipher.to_string(),
            password,
            udp: false,
            plugin: None,
            plugin_opts: None,
        })
    } else {
        ProtocolOptions::Ssr(SsrOptions {
            cipher: cipher.to_string(),
            password,
            protocol: protocol.to_string(),
            obfs: obfs.to_string(),
            obfs_param,
            protocol_param,
        })
    };

    Ok(ProxyRecord {
        name,
        server: server.to_string(),
        port,
        options,
    })
}
