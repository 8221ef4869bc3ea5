use core::fmt::Debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::aggregate::GroupChart;

pub const PLOT_DATA_DIR: &str = "plot_data";

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// Name of the renderer, for logging
    fn name(&self) -> &'static str;
    /// Renders one task group's chart
    ///
    /// Arguments:
    /// * `chart` - The ordered best times of one task group
    /// * `plot_path` - Directory the images are written to, it already exists
    ///
    /// Returns the paths of the files written
    fn render(&self, chart: &GroupChart, plot_path: &Path) -> Result<Vec<PathBuf>>;
}
clone_trait_object!(Plot);

#[derive(Debug, Default)]
pub struct RenderSummary {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

/// Writes the ordered bars of every chart as json, for re-plotting elsewhere
pub fn write_plot_data(charts: &[GroupChart], plot_path: &Path) -> Result<Vec<PathBuf>> {
    let plot_data_dir = plot_path.join(PLOT_DATA_DIR);
    fs::create_dir_all(&plot_data_dir)
        .with_context(|| format!("Create {}", plot_data_dir.display()))?;

    charts
        .iter()
        .map(|chart| {
            let data_path = plot_data_dir.join(format!("{}.json", chart.file_stem()));
            fs::write(&data_path, serde_json::to_string_pretty(chart)?)
                .with_context(|| format!("Write {}", data_path.display()))?;
            Ok(data_path)
        })
        .collect()
}

/// Renders every chart with every plot. Charts are independent of each other
/// so they are rendered in parallel; a chart that fails to render is logged
/// and counted, it does not stop the others.
pub fn render_charts(
    plots: &[Box<dyn Plot>],
    charts: &[GroupChart],
    plot_path: &Path,
) -> Result<RenderSummary> {
    fs::create_dir_all(plot_path).with_context(|| format!("Create {}", plot_path.display()))?;
    if plots.is_empty() || charts.is_empty() {
        debug!("Nothing to plot");
        return Ok(RenderSummary::default());
    }

    let jobs = charts
        .iter()
        .flat_map(|chart| plots.iter().map(move |plot| (chart, plot)))
        .collect::<Vec<_>>();
    let results = jobs
        .into_par_iter()
        .map(|(chart, plot)| (chart, plot.name(), plot.render(chart, plot_path)))
        .collect::<Vec<_>>();

    let mut summary = RenderSummary::default();
    for (chart, plot, result) in results {
        match result {
            Ok(files) => {
                for file in &files {
                    info!("Wrote {}", file.display());
                }
                summary.written.extend(files);
            }
            Err(err) => {
                warn!("{plot} failed for {}: {err:#}", chart.title);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
