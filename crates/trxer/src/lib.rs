//! Trxer - converts TRX test results into a self-contained HTML report
//!
//! The report template is XHTML with `{[ ... ]}` tags (see
//! `trxer_template`). Loading it inlines its stylesheets and script from
//! an [`AssetSource`]; rendering evaluates it against a [`Report`] built
//! from the TRX document, with the formatting helpers available as
//! template functions.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use trxer::{MapAssets, ReportFunctions, Trxer};
//!
//! let assets = MapAssets::new()
//!     .with("app.js", "function noop() {}")
//!     .with(
//!         "page.html",
//!         "<html><head><script src=\"app.js\"></script></head>\
//!          <body>{[ humanizeDuration(test.duration) ]}</body></html>",
//!     );
//! let template = Trxer::from_asset("page.html", &assets).unwrap();
//! let html = template
//!     .render(json!({"test": {"duration": "00:00:01.5000000"}}), &ReportFunctions)
//!     .unwrap();
//! assert!(html.ends_with("<body>1.50 seconds</body></html>"));
//! ```

pub mod assets;
pub mod context;
pub mod convert;
pub mod error;
pub mod functions;
pub mod helpers;
pub mod markup;
pub mod preprocess;
pub mod renderer;
pub mod report;
pub mod template_loader;
pub mod timespan;
pub mod trx;
pub mod value;

pub use assets::{AssetSource, EmbeddedAssets, MapAssets, TEMPLATE_ASSET};
pub use convert::{convert, default_output_path, ConvertOptions};
pub use error::{Result, TrxerError};
pub use functions::{ExtensionFunctions, ReportFunctions};
pub use renderer::Renderer;
pub use report::Report;
pub use template_loader::TemplateLoader;
pub use trxer_template::{Location, Template};
pub use value::Value;

use tracing::{debug, info};

/// A report template, inlined and compiled once, rendered any number of times
pub struct Trxer<'a> {
    template: Template,
    assets: &'a dyn AssetSource,
}

impl<'a> Trxer<'a> {
    /// Load the report template (`trxer.html`) from `assets`
    pub fn load(assets: &'a dyn AssetSource) -> Result<Self> {
        Self::from_asset(TEMPLATE_ASSET, assets)
    }

    /// Load the template stored under `name`
    pub fn from_asset(name: &str, assets: &'a dyn AssetSource) -> Result<Self> {
        info!("Loading template {name}...");
        let markup = assets.require(name)?;
        Self::from_markup(markup, assets)
    }

    /// Inline and compile template markup; partials and inlined files come from `assets`
    pub fn from_markup(markup: &str, assets: &'a dyn AssetSource) -> Result<Self> {
        let document = markup::parse(markup).map_err(|e| TrxerError::TemplateCompileError {
            message: format!("Template is not well-formed: {}", e.message),
            location: Location::new(e.line, 1),
        })?;
        let inlined = markup::serialize(&preprocess::inline_assets(&document, assets)?);
        debug!(bytes = inlined.len(), "template inlined");

        let template = trxer_template::parse(&inlined)?;
        Ok(Self { template, assets })
    }

    /// Render against arbitrary data with the given functions
    pub fn render(
        &self,
        data: serde_json::Value,
        functions: &dyn ExtensionFunctions,
    ) -> Result<String> {
        let value = Value::from_json(data)?;
        let mut loader = TemplateLoader::new(self.assets);
        Renderer::new(Some(&mut loader), functions).render(&self.template, value)
    }

    /// Render a report with the helper library
    pub fn render_report(&self, report: &Report) -> Result<String> {
        let data = serde_json::to_value(report)
            .map_err(|e| TrxerError::template(format!("Cannot serialize report: {e}")))?;
        self.render(data, &ReportFunctions)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Compile template text as-is and render it with the helper library.
///
/// No markup processing happens and includes are unavailable.
///
/// ```rust
/// let out = trxer::render("{[ stripTypeQualifier(c) ]}", serde_json::json!({"c": "A.B, Asm"})).unwrap();
/// assert_eq!(out, "A.B");
/// ```
pub fn render(source: &str, data: serde_json::Value) -> Result<String> {
    let template = trxer_template::parse(source)?;
    Renderer::new(None, &ReportFunctions).render(&template, Value::from_json(data)?)
}
