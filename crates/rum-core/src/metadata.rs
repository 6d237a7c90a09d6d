//! Out-of-band upload metadata: the application fields the server needs to
//! materialize the resulting episode, and the single-byte-safe wire encoding.
//!
//! Header transports only carry one text encoding, so every value is
//! base64-encoded on the wire: `key1 b64value1,key2 b64value2`, keys sorted
//! for deterministic output.

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Target-entity fields recorded with each session and sent at session open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    /// Collection (series/season) the episode belongs to.
    pub collection_id: String,
    /// Episode sequence number within the collection.
    pub sequence: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EpisodeMetadata {
    /// Wire key/value pairs for session open, including the file descriptor
    /// fields the server needs (name and MIME type).
    pub fn wire_fields(&self, file_name: &str, media_type: &str) -> Vec<(String, String)> {
        let mut fields = vec![
            ("collection_id".to_string(), self.collection_id.clone()),
            ("filename".to_string(), file_name.to_string()),
            ("filetype".to_string(), media_type.to_string()),
            ("sequence".to_string(), self.sequence.to_string()),
            ("title".to_string(), self.title.clone()),
        ];
        if let Some(desc) = &self.description {
            fields.push(("description".to_string(), desc.clone()));
        }
        fields
    }
}

/// Encode key/value pairs as `key b64value` items joined by commas, sorted by key.
pub fn encode_metadata(fields: &[(String, String)]) -> String {
    let mut fields: Vec<&(String, String)> = fields.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{} {}", k, BASE64.encode(v.as_bytes())))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode the wire encoding back into key/value pairs.
pub fn decode_metadata(encoded: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for item in encoded.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let Some((key, value)) = item.split_once(' ') else {
            bail!("malformed metadata item: {item:?}");
        };
        let bytes = BASE64.decode(value.trim())?;
        let value = String::from_utf8(bytes)?;
        out.push((key.to_string(), value));
    }
    Ok(out)
}
