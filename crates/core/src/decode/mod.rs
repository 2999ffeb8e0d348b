//! Share-link decoders, one per URI scheme.
//!
//! Dispatch is by literal, case-sensitive prefix. Each scheme is registered
//! with a capability flag; a disabled scheme fails the same way an unknown
//! one does, so callers cannot tell the two apart.

mod hysteria;
mod ss;
mod ssr;
mod trojan;
mod vmess;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{DecodeError, LinkError};
use crate::record::ProxyRecord;

struct Decoder {
    prefix: &'static str,
    enabled: bool,
    decode: fn(&str) -> Result<ProxyRecord, DecodeError>,
}

pub struct DecoderRegistry {
    decoders: Vec<Decoder>,
}

impl DecoderRegistry {
    /// The stock registry: ss/vmess/trojan live, ssr/hysteria present but
    /// switched off.
    pub fn with_defaults() -> Self {
        Self {
            decoders: vec![
                Decoder {
                    prefix: "ss://",
                    enabled: true,
                    decode: ss::decode,
                },
                Decoder {
                    prefix: "ssr://",
                    enabled: false,
                    decode: ssr::decode,
                },
                Decoder {
                    prefix: "vmess://",
                    enabled: true,
                    decode: vmess::decode,
                },
                Decoder {
                    prefix: "trojan://",
                    enabled: true,
                    decode: trojan::decode,
                },
                Decoder {
                    prefix: "hysteria://",
                    enabled: false,
                    decode: hysteria::decode,
                },
            ],
        }
    }

    pub fn set_enabled(&mut self, prefix: &str, enabled: bool) {
        for decoder in &mut self.decoders {
            if decoder.prefix == prefix {
                decoder.enabled = enabled;
            }
        }
    }

    /// Decode a single trimmed line into a proxy record.
    pub fn decode_line(&self, line: &str) -> Result<ProxyRecord, LinkError> {
        for decoder in &self.decoders {
            if !line.starts_with(decoder.prefix) {
                continue;
            }
            if !decoder.enabled {
                return Err(LinkError::UnsupportedScheme);
            }
            return (decoder.decode)(line).map_err(LinkError::from);
        }
        Err(LinkError::UnsupportedScheme)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Share links strip `=` padding and occasionally use the URL-safe alphabet;
/// restore padding and try both.
pub(crate) fn decode_share_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut padded = input.trim().to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    match STANDARD.decode(&padded) {
        Ok(bytes) => Ok(bytes),
        Err(err) => URL_SAFE_NO_PAD.decode(input.trim()).map_err(|_| err),
    }
}

pub(crate) fn decode_share_text(input: &str) -> Result<String, DecodeError> {
    let bytes = decode_share_base64(input)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)
}

pub(crate) fn percent_decode(input: &str) -> Result<String, DecodeError> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|text| text.into_owned())
        .map_err(|_| DecodeError::Utf8)
}

pub(crate) fn require_port(url: &Url) -> Result<u16, DecodeError> {
    url.port().filter(|port| *port > 0).ok_or(DecodeError::Port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_prefix_is_unsupported() {
        let registry = DecoderRegistry::with_defaults();
        assert!(matches!(
            registry.decode_line("socks5://example.com:1080"),
            Err(LinkError::UnsupportedScheme)
        ));
    }

    #[test]
    fn prefix_matching_is_case_sensitive() {
        let registry = DecoderRegistry::with_defaults();
        assert!(matches!(
            registry.decode_line("SS://whatever"),
            Err(LinkError::UnsupportedScheme)
        ));
    }

    #[test]
    fn disabled_scheme_reads_like_unknown() {
        let registry = DecoderRegistry::with_defaults();
        let disabled = registry
            .decode_line("ssr://aG9zdDo0NDM")
            .expect_err("ssr is registered disabled");
        let unknown = registry
            .decode_line("wireguard://example")
            .expect_err("no such scheme");
        assert_eq!(disabled.to_string(), unknown.to_string());
    }

    #[test]
    fn reenabled_scheme_decodes() {
        let mut registry = DecoderRegistry::with_defaults();
        let body = STANDARD.encode("example.com:443:origin:aes-256-gcm:plain:cGFzcw/?remarks=bm9kZQ");
        let link = format!("ssr://{body}");

        assert!(matches!(
            registry.decode_line(&link),
            Err(LinkError::UnsupportedScheme)
        ));

        registry.set_enabled("ssr://", true);
        let record = registry.decode_line(&link).unwrap();
        assert_eq!(record.server, "example.com");
    }

    #[test]
    fn padding_is_restored_before_decoding() {
        assert_eq!(decode_share_text("cGFzcw").unwrap(), "pass");
        assert_eq!(decode_share_text("cGFzcw==").unwrap(), "pass");
    }
}
