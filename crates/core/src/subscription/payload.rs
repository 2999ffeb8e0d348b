//! Payload-shape detection and per-line decoding.
//!
//! A decoded subscription body is one of three things, tried in order: a
//! full routing document (proxies pass through untouched), a
//! server-directory JSON export, or newline-delimited share links. A payload
//! that parses as a routing document is never reinterpreted, even if it
//! would also satisfy a later shape.

use std::collections::HashMap;

use serde::Deserialize;
use serde_yaml::Value;

use crate::decode::DecoderRegistry;
use crate::record::{BatchEntry, PluginOpts, ProtocolOptions, ProxyRecord, SsOptions};

/// Fixed sentinel present in every server-directory export.
const SERVER_DIRECTORY_MARKER: &str = "airport";

#[derive(Deserialize)]
struct FullDocument {
    // No default: the key must be present for the payload to count as a
    // routing document, otherwise directory JSON would match here too.
    proxies: Vec<Value>,
}

/// Turn one decoded payload into a batch of entries.
///
/// Individual bad entries are logged and skipped; the batch itself never
/// fails. An unrecognizable payload degrades to the line-delimited path and,
/// at worst, an empty batch.
pub fn parse_payload(payload: &str, registry: &DecoderRegistry) -> Vec<BatchEntry> {
    if let Ok(document) = serde_yaml::from_str::<FullDocument>(payload) {
        return document
            .proxies
            .into_iter()
            .map(BatchEntry::Fragment)
            .collect();
    }

    if payload.contains(SERVER_DIRECTORY_MARKER) {
        return parse_server_directory(payload);
    }

    parse_link_lines(payload, registry)
}

/// Decode newline-delimited share links, one record per parseable line.
pub fn parse_link_lines(payload: &str, registry: &DecoderRegistry) -> Vec<BatchEntry> {
    let mut entries = Vec::new();
    for line in payload.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match registry.decode_line(line) {
            Ok(record) => entries.push(BatchEntry::Record(record)),
            Err(err) => tracing::warn!(error = %err, line = %line, "skipping share link"),
        }
    }
    entries
}

#[derive(Deserialize)]
struct ServerDirectory {
    #[serde(default)]
    servers: Vec<DirectoryServer>,
}

#[derive(Deserialize)]
struct DirectoryServer {
    #[serde(default)]
    remarks: String,
    #[serde(default)]
    encryption: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    server: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    plugin: String,
    #[serde(default, rename = "plugin_options")]
    plugin_options: String,
}

fn parse_server_directory(payload: &str) -> Vec<BatchEntry> {
    let directory: ServerDirectory = match serde_json::from_str(payload) {
        Ok(directory) => directory,
        Err(err) => {
            tracing::warn!(error = %err, "server directory JSON is invalid");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for server in directory.servers {
        if server.remarks.is_empty() {
            continue;
        }

        let options: HashMap<String, String> =
            url::form_urlencoded::parse(server.plugin_options.as_bytes())
                .into_owned()
                .collect();

        // Every obfs plugin variant collapses to the one name the engine
        // knows.
        let plugin = if server.plugin.contains("obfs") {
            "obfs".to_string()
        } else {
            server.plugin
        };

        let plugin_opts = (!plugin.is_empty()).then(|| PluginOpts {
            mode: options.get("obfs").cloned().unwrap_or_default(),
            host: options.get("obfs-host").cloned(),
            ..PluginOpts::default()
        });

        entries.push(BatchEntry::Record(ProxyRecord {
            name: server.remarks,
            server: server.server,
            port: server.port,
            options: ProtocolOptions::Ss(SsOptions {
                cipher: server.encryption,
                password: server.password,
                udp: false,
                plugin: (!plugin.is_empty()).then_some(plugin),
                plugin_opts,
            }),
        }));
    }
    entries
}
