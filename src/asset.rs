//! Backend asset records and their renderable form
//!
//! Backend `kind` strings are mapped onto a closed set of asset types, and
//! each record is checked for the field its type needs. Records that fail
//! the check are dropped, not reported: a broken asset never blocks the
//! rest of an experience.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error type for asset normalization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset '{name}' of type {kind} is missing its {field}")]
    MissingField {
        name: String,
        kind: AssetKind,
        field: &'static str,
    },

    #[error("Empty URL")]
    EmptyUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Renderable asset types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Message,
    Image,
    Video,
    Model3d,
}

impl AssetKind {
    /// Map a backend kind string. Unknown kinds become `Message`; the flag
    /// is `false` for them.
    pub fn from_backend(kind: &str) -> (AssetKind, bool) {
        match kind.trim().to_ascii_lowercase().as_str() {
            "message" | "text" => (AssetKind::Message, true),
            "image" => (AssetKind::Image, true),
            "video" => (AssetKind::Video, true),
            "model3d" | "model" | "3d" => (AssetKind::Model3d, true),
            _ => (AssetKind::Message, false),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Message => "message",
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Model3d => "model3d",
        }
    }

    /// Name of the record field this kind cannot render without
    pub fn required_field(&self) -> &'static str {
        match self {
            AssetKind::Message => "text",
            _ => "url",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset as delivered by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size_bytes: Option<u64>,
}

/// Experience payload: a named set of assets opened from a QR code
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

/// What a viewer is handed for one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AssetContent {
    Message(String),
    Image(String),
    Video(String),
    Model3d(String),
}

impl AssetContent {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetContent::Message(_) => AssetKind::Message,
            AssetContent::Image(_) => AssetKind::Image,
            AssetContent::Video(_) => AssetKind::Video,
            AssetContent::Model3d(_) => AssetKind::Model3d,
        }
    }

    /// Resolved URL, for every kind except messages
    pub fn url(&self) -> Option<&str> {
        match self {
            AssetContent::Message(_) => None,
            AssetContent::Image(url) | AssetContent::Video(url) | AssetContent::Model3d(url) => {
                Some(url.as_str())
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            AssetContent::Message(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Validated, renderable asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAsset {
    pub id: Option<String>,
    pub name: String,
    pub content: AssetContent,
    pub mime_type: Option<String>,
    pub file_size_bytes: Option<u64>,
}

impl NormalizedAsset {
    pub fn kind(&self) -> AssetKind {
        self.content.kind()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve an asset URL against the page origin.
///
/// Absolute URLs come back unchanged. `/path` is resolved against the origin,
/// `//host/path` takes the origin's scheme, and any other relative form is
/// treated as a path under the origin root.
pub fn normalize_url(raw: &str, origin: &Url) -> Result<String, AssetError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AssetError::EmptyUrl);
    }
    if raw.starts_with('/') {
        return Ok(origin.join(raw)?.to_string());
    }
    if Url::parse(raw).is_ok() {
        return Ok(raw.to_string());
    }

    let mut path = raw;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    Ok(origin.join(&format!("/{path}"))?.to_string())
}

/// Validate and resolve one record, reporting why it was rejected
pub fn try_normalize(record: &AssetRecord, origin: &Url) -> Result<NormalizedAsset, AssetError> {
    let (kind, known) = AssetKind::from_backend(&record.kind);
    if !known {
        log::warn!(
            "Unknown asset kind '{}' for '{}', treating as message",
            record.kind,
            record.name
        );
    }

    let missing = || AssetError::MissingField {
        name: record.name.clone(),
        kind,
        field: kind.required_field(),
    };

    let content = match kind {
        AssetKind::Message => {
            AssetContent::Message(non_blank(&record.text).ok_or_else(missing)?.to_string())
        }
        _ => {
            let url = normalize_url(non_blank(&record.url).ok_or_else(missing)?, origin)?;
            match kind {
                AssetKind::Image => AssetContent::Image(url),
                AssetKind::Video => AssetContent::Video(url),
                _ => AssetContent::Model3d(url),
            }
        }
    };

    Ok(NormalizedAsset {
        id: record.id.clone(),
        name: record.name.clone(),
        content,
        mime_type: record.mime_type.clone(),
        file_size_bytes: record.file_size_bytes,
    })
}

/// Validate and resolve one record; `None` if it cannot be rendered
pub fn normalize(record: &AssetRecord, origin: &Url) -> Option<NormalizedAsset> {
    match try_normalize(record, origin) {
        Ok(asset) => Some(asset),
        Err(err) => {
            log::debug!("Dropping asset: {err}");
            None
        }
    }
}

/// Normalize a batch, dropping records that cannot be rendered
pub fn normalize_all<'a, I>(records: I, origin: &Url) -> Vec<NormalizedAsset>
where
    I: IntoIterator<Item = &'a AssetRecord>,
{
    records
        .into_iter()
        .filter_map(|record| normalize(record, origin))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://x.test").unwrap()
    }

    fn record(kind: &str, url: Option<&str>, text: Option<&str>) -> AssetRecord {
        AssetRecord {
            name: "n".to_string(),
            kind: kind.to_string(),
            url: url.map(str::to_string),
            text: text.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_message() {
        let asset = normalize(&record("message", None, Some("hi")), &origin()).unwrap();
        assert_eq!(asset.kind(), AssetKind::Message);
        assert_eq!(asset.content, AssetContent::Message("hi".to_string()));
    }

    #[test]
    fn test_image_without_url_is_dropped() {
        assert!(normalize(&record("image", None, None), &origin()).is_none());
        assert!(normalize(&record("image", Some("   "), None), &origin()).is_none());
    }

    #[test]
    fn test_message_without_text_is_dropped() {
        let err = try_normalize(&record("message", Some("/a.png"), None), &origin()).unwrap_err();
        assert!(matches!(err, AssetError::MissingField { field: "text", .. }));
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(AssetKind::from_backend("IMAGE"), (AssetKind::Image, true));
        assert_eq!(AssetKind::from_backend("model"), (AssetKind::Model3d, true));
        assert_eq!(AssetKind::from_backend("3d"), (AssetKind::Model3d, true));
        assert_eq!(AssetKind::from_backend("text"), (AssetKind::Message, true));
        assert_eq!(AssetKind::from_backend("hologram"), (AssetKind::Message, false));
    }

    #[test]
    fn test_unknown_kind_needs_text() {
        let asset = normalize(&record("hologram", None, Some("fallback")), &origin()).unwrap();
        assert_eq!(asset.kind(), AssetKind::Message);
        assert!(normalize(&record("hologram", Some("/x.glb"), None), &origin()).is_none());
    }

    #[test]
    fn test_model_url_resolved() {
        let asset =
            normalize(&record("model3d", Some("/models/chair.glb"), None), &origin()).unwrap();
        assert_eq!(asset.content.url(), Some("https://x.test/models/chair.glb"));
    }

    #[test]
    fn test_normalize_url() {
        let origin = origin();
        assert_eq!(normalize_url("/a/b", &origin).unwrap(), "https://x.test/a/b");
        assert_eq!(
            normalize_url("https://y.test/z", &origin).unwrap(),
            "https://y.test/z"
        );
        assert_eq!(normalize_url("a/b", &origin).unwrap(), "https://x.test/a/b");
        assert_eq!(normalize_url("./a/b", &origin).unwrap(), "https://x.test/a/b");
        assert_eq!(
            normalize_url("//cdn.test/m.glb", &origin).unwrap(),
            "https://cdn.test/m.glb"
        );
        assert_eq!(normalize_url("", &origin), Err(AssetError::EmptyUrl));
    }

    #[test]
    fn test_absolute_url_is_untouched() {
        // no trailing slash added, query kept verbatim
        let origin = origin();
        assert_eq!(
            normalize_url("https://y.test", &origin).unwrap(),
            "https://y.test"
        );
        assert_eq!(
            normalize_url("blob:https://x.test/1234", &origin).unwrap(),
            "blob:https://x.test/1234"
        );
    }

    #[test]
    fn test_normalize_all_filters() {
        let records = vec![
            record("image", Some("/a.png"), None),
            record("video", None, None),
            record("message", None, Some("welcome")),
        ];
        let assets = normalize_all(&records, &origin());
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].kind(), AssetKind::Image);
        assert_eq!(assets[1].kind(), AssetKind::Message);
    }

    #[test]
    fn test_backend_payload() {
        let json = r#"{
            "id": "exp-1",
            "name": "Gallery",
            "assets": [
                {"id": "a1", "name": "Poster", "kind": "image", "url": "/p.jpg",
                 "mimeType": "image/jpeg", "fileSizeBytes": 20480},
                {"name": "Hello", "kind": "message", "text": "Scan me"}
            ]
        }"#;
        let experience: Experience = serde_json::from_str(json).unwrap();
        assert_eq!(experience.assets.len(), 2);
        assert_eq!(experience.assets[0].mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(experience.assets[0].file_size_bytes, Some(20480));

        let assets = normalize_all(&experience.assets, &origin());
        assert_eq!(assets[0].content.url(), Some("https://x.test/p.jpg"));
    }
}
