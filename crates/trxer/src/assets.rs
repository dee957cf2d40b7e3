//! Named text resources: the report template, its stylesheets, script and partials.

use crate::error::{Result, TrxerError};
use include_dir::{include_dir, Dir};
use std::collections::HashMap;

/// Name of the report template inside an asset source
pub const TEMPLATE_ASSET: &str = "trxer.html";

/// Resources bundled at build time.
static BUNDLED: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Lookup of text resources by name (`trxer.css`, `partials/_result.html`, ...)
pub trait AssetSource {
    fn get(&self, name: &str) -> Option<&str>;

    /// Like [`get`](AssetSource::get), failing with `ResourceNotFound`
    fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| TrxerError::ResourceNotFound {
            name: name.to_string(),
        })
    }
}

/// The resources compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl AssetSource for EmbeddedAssets {
    fn get(&self, name: &str) -> Option<&str> {
        BUNDLED.get_file(name).and_then(|f| f.contents_utf8())
    }
}

/// In-memory resources, for custom templates and tests
#[derive(Debug, Default, Clone)]
pub struct MapAssets {
    entries: HashMap<String, String>,
}

impl MapAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a copy of the bundled resources
    pub fn from_embedded() -> Self {
        let mut assets = Self::new();
        let mut pending = vec![&BUNDLED];
        while let Some(dir) = pending.pop() {
            for file in dir.files() {
                if let (Some(name), Some(text)) = (file.path().to_str(), file.contents_utf8()) {
                    assets.insert(name, text);
                }
            }
            pending.extend(dir.dirs());
        }
        assets
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(name.into(), text.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }
}

impl AssetSource for MapAssets {
    fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_bundle_is_complete() {
        for name in [TEMPLATE_ASSET, "trxer.css", "trxer-table.css", "functions.js"] {
            assert!(EmbeddedAssets.get(name).is_some(), "{name} missing");
        }
        assert!(EmbeddedAssets.get("partials/_result.html").is_some());
    }

    #[test]
    fn test_require_reports_name() {
        let err = MapAssets::new().require("missing.css").unwrap_err();
        assert!(matches!(err, TrxerError::ResourceNotFound { name } if name == "missing.css"));
    }

    #[test]
    fn test_from_embedded_copies_nested_files() {
        let mut assets = MapAssets::from_embedded();
        assert_eq!(assets.get(TEMPLATE_ASSET), EmbeddedAssets.get(TEMPLATE_ASSET));
        assert!(assets.get("partials/_result.html").is_some());
        assert!(assets.remove("trxer.css").is_some());
        assert!(assets.get("trxer.css").is_none());
    }
}
