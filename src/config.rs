use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactStore, ImageFormat};
use crate::plot::RenderSettings;

/// Config file read from the working directory when present.
pub const CONFIG_FILE: &str = "file-analyzer.toml";
/// Prefix of environment overrides, e.g. `FILE_ANALYZER_PORT=9000`.
pub const ENV_PREFIX: &str = "FILE_ANALYZER_";

// ---------------------------------------------------------------------------
// AnalyzerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the persisted `csv/` and `<ext>/` snapshot directories.
    pub output_dir: PathBuf,
    pub persist_artifacts: bool,
    pub image_format: ImageFormat,
    pub plot_width: u32,
    pub plot_height: u32,
    pub hist_bins: usize,
    /// Font for chart text; common system fonts are probed when unset.
    pub font_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    /// Datasets kept in memory; the least recently used session is evicted.
    pub max_sessions: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            output_dir: PathBuf::from("saved"),
            persist_artifacts: true,
            image_format: ImageFormat::Jpeg,
            plot_width: 640,
            plot_height: 480,
            hist_bins: 10,
            font_path: None,
            max_upload_bytes: 50 * 1024 * 1024,
            max_sessions: 64,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, then `path` (if it exists), then `FILE_ANALYZER_*` variables.
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AnalyzerConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::figment(CONFIG_FILE)
            .extract()
            .with_context(|| format!("invalid configuration ({CONFIG_FILE} / {ENV_PREFIX}*)"))
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            width: self.plot_width,
            height: self.plot_height,
            format: self.image_format,
            hist_bins: self.hist_bins,
        }
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.output_dir, self.persist_artifacts)
    }
}
