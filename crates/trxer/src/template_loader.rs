//! Resolves `{[> /name]}` includes against an asset source.

use crate::assets::AssetSource;
use crate::error::{Result, TrxerError};
use std::collections::HashMap;
use tracing::debug;
use trxer_template::Template;

const PARTIAL_DIR: &str = "partials";
const PARTIAL_EXTENSION: &str = "html";

/// Loads, compiles and caches partial templates
pub struct TemplateLoader<'a> {
    assets: &'a dyn AssetSource,
    cache: HashMap<String, Template>,
    include_stack: Vec<String>,
}

impl<'a> TemplateLoader<'a> {
    pub fn new(assets: &'a dyn AssetSource) -> Self {
        Self {
            assets,
            cache: HashMap::new(),
            include_stack: Vec::new(),
        }
    }

    /// Load a partial by include name, e.g. `/result/row`
    pub fn load(&mut self, name: &str) -> Result<Template> {
        validate_include_name(name)?;

        if self.include_stack.iter().any(|n| n == name) {
            return Err(TrxerError::template(format!(
                "Circular include detected: {}",
                self.include_stack.join(" -> ") + " -> " + name
            )));
        }

        if let Some(template) = self.cache.get(name) {
            return Ok(template.clone());
        }

        let asset = asset_name(name);
        debug!(include = name, asset = %asset, "loading partial");
        let source = self.assets.require(&asset)?;
        let template = trxer_template::parse(source).map_err(|e| {
            TrxerError::template(format!("Failed to compile partial '{name}': {e}"))
        })?;
        self.cache.insert(name.to_string(), template.clone());
        Ok(template)
    }

    pub fn push_include(&mut self, name: &str) {
        self.include_stack.push(name.to_string());
    }

    pub fn pop_include(&mut self) {
        self.include_stack.pop();
    }
}

/// `/result/row` → `partials/result/_row.html`
pub fn asset_name(include_name: &str) -> String {
    let mut segments: Vec<String> = std::iter::once(PARTIAL_DIR.to_string())
        .chain(
            include_name
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        )
        .collect();
    if let Some(last) = segments.last_mut() {
        *last = format!("_{last}.{PARTIAL_EXTENSION}");
    }
    segments.join("/")
}

fn validate_include_name(name: &str) -> Result<()> {
    if !name.starts_with('/') {
        return Err(TrxerError::template(format!(
            "Include name must start with '/': {name}"
        )));
    }

    if name.contains("..") || name.contains("//") || name.contains('\\') || name.contains(':') {
        return Err(TrxerError::template(format!(
            "Invalid include name (path traversal): {name}"
        )));
    }

    match name.split('/').filter(|s| !s.is_empty()).find(|s| !is_valid_segment(s)) {
        Some(segment) => Err(TrxerError::template(format!(
            "Invalid include segment '{segment}' in '{name}'"
        ))),
        None => Ok(()),
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MapAssets;

    #[test]
    fn test_asset_name() {
        assert_eq!(asset_name("/summary"), "partials/_summary.html");
        assert_eq!(asset_name("/result/row"), "partials/result/_row.html");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_include_name("/result/row").is_ok());
        assert!(validate_include_name("no-slash").is_err());
        assert!(validate_include_name("/with/../traversal").is_err());
        assert!(validate_include_name("/with-dash").is_err());
    }

    #[test]
    fn test_load_caches_and_reports_missing() {
        let assets = MapAssets::new().with("partials/_row.html", "<tr>{[ test.name ]}</tr>");
        let mut loader = TemplateLoader::new(&assets);
        assert_eq!(loader.load("/row").unwrap().nodes.len(), 3);
        assert!(loader.cache.contains_key("/row"));

        assert!(matches!(
            loader.load("/missing"),
            Err(TrxerError::ResourceNotFound { name }) if name == "partials/_missing.html"
        ));
    }

    #[test]
    fn test_circular_include_detection() {
        let assets = MapAssets::new().with("partials/_a.html", "x");
        let mut loader = TemplateLoader::new(&assets);
        loader.push_include("/a");
        assert!(matches!(
            loader.load("/a"),
            Err(TrxerError::TemplateCompileError { .. })
        ));
        loader.pop_include();
        assert!(loader.load("/a").is_ok());
    }
}
