use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use common::{aggregate::GroupChart, plot::Plot};
use eyre::{Result, ensure};
use plotters::{
    coord::Shift,
    prelude::*,
    style::{FontStyle, FontTransform, register_font},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const FONT_FAMILY: &str = "sans-serif";

static FONT_REGISTERED: LazyLock<bool> = LazyLock::new(|| {
    match register_font(
        FONT_FAMILY,
        FontStyle::Normal,
        include_bytes!("assets/DejaVuSans.ttf"),
    ) {
        Ok(()) => true,
        Err(_) => {
            error!("Could not register bundled font");
            false
        }
    }
});

/// Best time per implementation as a bar chart, written as `<title>.png` and `<title>.svg`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BarChart {
    pub width: u32,
    pub height: u32,
    pub y_label: String,
    /// Bar fill as rgb
    pub color: [u8; 3],
}

impl Default for BarChart {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 900,
            y_label: "time (ns) lower is better".to_owned(),
            color: [31, 119, 180],
        }
    }
}

#[typetag::serde]
impl Plot for BarChart {
    fn name(&self) -> &'static str {
        "bar-chart"
    }

    fn render(&self, chart: &GroupChart, plot_path: &Path) -> Result<Vec<PathBuf>> {
        if chart.bars.is_empty() {
            debug!("{} has no bars", chart.title);
            return Ok(Vec::new());
        }
        ensure!(*FONT_REGISTERED, "No font available for chart text");

        let stem = chart.file_stem();
        let png_path = plot_path.join(format!("{stem}.png"));
        let svg_path = plot_path.join(format!("{stem}.svg"));
        let size = (self.width, self.height);

        self.draw(BitMapBackend::new(&png_path, size).into_drawing_area(), chart)?;
        self.draw(SVGBackend::new(&svg_path, size).into_drawing_area(), chart)?;
        Ok(vec![png_path, svg_path])
    }
}

impl BarChart {
    fn draw<DB>(&self, root: DrawingArea<DB, Shift>, chart: &GroupChart) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let labels = chart.labels();
        let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
        let y_max = (chart.max_time() as f64 * 1.1).max(1.0);
        let [r, g, b] = self.color;

        root.fill(&WHITE)?;
        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, (FONT_FAMILY, 32))
            .margin(20)
            .x_label_area_size((longest * 11 + 20).clamp(60, 320))
            .y_label_area_size(120)
            .build_cartesian_2d((0u32..labels.len() as u32).into_segmented(), 0f64..y_max)?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(idx) => labels
                    .get(*idx as usize)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_label_style(
                (FONT_FAMILY, 18)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_formatter(&|v| format!("{v:.0}"))
            .y_desc(self.y_label.as_str())
            .axis_desc_style((FONT_FAMILY, 20))
            .draw()?;

        ctx.draw_series(
            Histogram::vertical(&ctx)
                .style(RGBColor(r, g, b).filled())
                .margin(12)
                .data(
                    chart
                        .bars
                        .iter()
                        .enumerate()
                        .map(|(idx, (_, time_ns))| (idx as u32, *time_ns as f64)),
                ),
        )?;

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use common::{aggregate::BestTimes, config::Config, record::Record};

    use super::*;

    fn chart() -> GroupChart {
        [
            Record::new("sort", "rust", 95, "a"),
            Record::new("sort", "tenge(pdq)", 120, "a"),
            Record::new("sort", "c(-)", 80, "a"),
        ]
        .into_iter()
        .collect::<BestTimes>()
        .charts()
        .remove(0)
    }

    #[test]
    fn bundled_font_registers() {
        assert!(*FONT_REGISTERED);
    }

    #[test]
    fn writes_raster_and_vector() {
        let dir = tempfile::tempdir().unwrap();
        let written = BarChart::default().render(&chart(), dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("sort_benchmark.png"),
                dir.path().join("sort_benchmark.svg")
            ]
        );
        assert!(fs::metadata(&written[0]).unwrap().len() > 0);

        let svg = fs::read_to_string(&written[1]).unwrap();
        assert!(svg.contains("sort_benchmark"));
        assert!(svg.contains("tenge(pdq)"));
        assert!(svg.contains("lower is better"));
    }

    #[test]
    fn empty_chart_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let chart = GroupChart {
            group: "misc".to_owned(),
            title: "misc_benchmark".to_owned(),
            bars: Vec::new(),
        };
        assert!(BarChart::default().render(&chart, dir.path()).unwrap().is_empty());
        assert!(!dir.path().join("misc_benchmark.png").exists());
    }

    #[test]
    fn configured_from_yaml() {
        let config = Config::from_yaml("plots:\n  - type: BarChart\n    width: 640\n").unwrap();
        assert_eq!(config.plots.len(), 1);
        assert_eq!(config.plots[0].name(), "bar-chart");

        let yaml = serde_yml::to_string(&config.plots).unwrap();
        assert!(yaml.contains("width: 640"));
        assert!(yaml.contains("height: 900"));
    }
}
