use url::Url;

use super::{decode_share_base64, percent_decode, require_port};
use crate::error::DecodeError;
use crate::record::{ProtocolOptions, ProxyRecord, SsOptions};

/// `ss://<base64(method:password)>@host:port#name`
///
/// Some providers emit the user-info as `method@password`; the first `@` in
/// the decoded text is repaired to `:` before splitting.
pub(super) fn decode(link: &str) -> Result<ProxyRecord, DecodeError> {
    let url = Url::parse(link)?;
    let server = url
        .host_str()
        .ok_or(DecodeError::Malformed("missing host"))?
        .to_string();
    let port = require_port(&url)?;
    let name = percent_decode(url.fragment().unwrap_or_default())?;

    let decoded = decode_share_base64(url.username())?;
    let mut userinfo = String::from_utf8(decoded).map_err(|_| DecodeError::Utf8)?;
    if userinfo.contains('@') {
        userinfo = userinfo.replacen('@', ":", 1);
    }
    let (cipher, password) = userinfo
        .split_once(':')
        .ok_or(DecodeError::Malformed("missing cipher or password"))?;

    Ok(ProxyRecord {
        name,
        server,
        port,
        options: ProtocolOptions::Ss(SsOptions {
            cipher: cipher.to_string(),
            password: password.to_string(),
            udp: true,
            plugin: None,
            plugin_opts: None,
        }),
    })
}
