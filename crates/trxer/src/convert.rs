//! The end-to-end TRX to HTML conversion.

use crate::assets::AssetSource;
use crate::error::{Result, TrxerError};
use crate::report::Report;
use crate::trx;
use crate::Trxer;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to convert and where the resources come from
pub struct ConvertOptions<'a> {
    pub input: PathBuf,
    /// Defaults to the input path with `.html` appended
    pub output: Option<PathBuf>,
    pub assets: &'a dyn AssetSource,
}

impl<'a> ConvertOptions<'a> {
    pub fn new(input: impl Into<PathBuf>, assets: &'a dyn AssetSource) -> Self {
        Self {
            input: input.into(),
            output: None,
            assets,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// `results/run.trx` → `results/run.trx.html`
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut path = OsString::from(input.as_os_str());
    path.push(".html");
    PathBuf::from(path)
}

/// Convert one TRX file, returning the path of the written report.
///
/// Nothing is written unless every earlier step succeeded.
pub fn convert(options: &ConvertOptions<'_>) -> Result<PathBuf> {
    info!("Trx File\n{}", options.input.display());

    let template = Trxer::load(options.assets)?;
    let run = trx::read_file(&options.input)?;
    let report = Report::from_run(&run);

    info!("Transforming...");
    let html = template.render_report(&report)?;

    let output = options.output_path();
    fs::write(&output, &html).map_err(|source| TrxerError::OutputWriteError {
        path: output.clone(),
        source,
    })?;
    debug!(path = %output.display(), bytes = html.len(), "wrote report");
    info!("Done transforming xml into html");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::EmbeddedAssets;

    #[test]
    fn test_default_output_path_appends_extension() {
        assert_eq!(
            default_output_path(Path::new("out/run.trx")),
            PathBuf::from("out/run.trx.html")
        );
        assert_eq!(default_output_path(Path::new("run")), PathBuf::from("run.html"));
    }

    #[test]
    fn test_explicit_output_wins() {
        let options = ConvertOptions::new("a.trx", &EmbeddedAssets).with_output("report.html");
        assert_eq!(options.output_path(), PathBuf::from("report.html"));
    }

    #[test]
    fn test_unwritable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.trx");
        fs::write(&input, "<TestRun name=\"r\"/>").unwrap();
        let options = ConvertOptions::new(&input, &EmbeddedAssets)
            .with_output(dir.path().join("missing-dir").join("out.html"));
        assert!(matches!(
            convert(&options),
            Err(TrxerError::OutputWriteError { .. })
        ));
    }
}
