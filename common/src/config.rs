use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;
use tracing::debug;

use crate::plot::Plot;

pub const DEFAULT_CONFIG_FILE: &str = "bench-plot.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Searched recursively for result files
    pub results_dir: PathBuf,
    /// Where the chart images are written
    pub out_dir: PathBuf,
    /// Result file extensions, without the dot
    pub extensions: Vec<String>,
    /// Also write the ordered chart data as json
    pub plot_data: bool,
    /// Renderers run for each chart, the binary supplies a default when empty
    pub plots: Vec<Box<dyn Plot>>,
    pub gallery: GallerySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            out_dir: PathBuf::from("plots"),
            extensions: vec!["csv".to_owned(), "txt".to_owned(), "log".to_owned()],
            plot_data: false,
            plots: Vec::new(),
            gallery: GallerySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GallerySettings {
    pub title: String,
    /// The index page is written here
    pub docs_dir: PathBuf,
    /// Directory under `docs_dir` holding the chart images
    pub plots_subdir: String,
    pub footer: String,
    pub links: Vec<Link>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            title: "Benchmarks".to_owned(),
            docs_dir: PathBuf::from("docs"),
            plots_subdir: "plots".to_owned(),
            footer: "Benchmarks gallery".to_owned(),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Loads the config file. A missing file is only an error when it was
    /// asked for explicitly, otherwise the defaults are used.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            debug!("No {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let yaml = read_to_string(&path)
            .await
            .with_context(|| format!("Read config {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Parse config {}", path.display()))
    }
}
