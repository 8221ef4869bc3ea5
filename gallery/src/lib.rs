use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use common::config::{GallerySettings, Link};
use eyre::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use tokio::fs::{create_dir_all, read_dir, write};
use tracing::{debug, info};

pub const INDEX_FILE: &str = "index.html";

/// One chart stem with whichever images exist for it. On the page the card
/// shows the raster image when there is one and links to the vector image.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    /// Raster file name
    pub png: Option<String>,
    /// Vector file name
    pub svg: Option<String>,
}

impl Series {
    pub fn title(&self) -> String {
        self.name.replace("_benchmark", "").replace('_', " ")
    }

    fn card(&self, href_prefix: &str) -> Option<Card> {
        let href = |file: &String| {
            if href_prefix.is_empty() {
                file.clone()
            } else {
                format!("{}/{file}", href_prefix.trim_end_matches('/'))
            }
        };
        let png = self.png.as_ref().map(href);
        let svg = self.svg.as_ref().map(href);
        Some(Card {
            src: png.clone().or_else(|| svg.clone())?,
            href: svg.or(png)?,
            alt: self.name.clone(),
            title: self.title(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Card {
    href: String,
    src: String,
    alt: String,
    title: String,
}

#[derive(Debug, Serialize)]
struct IndexContext<'a> {
    title: &'a str,
    updated: String,
    links: &'a [Link],
    cards: Vec<Card>,
    footer: &'a str,
}

/// Collects chart images in `plots_dir`, sorted by stem. A missing directory has no series.
pub async fn collect_series(plots_dir: &Path) -> Result<Vec<Series>> {
    let mut series: BTreeMap<String, Series> = BTreeMap::new();
    let mut entries = match read_dir(plots_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist", plots_dir.display());
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Read {}", plots_dir.display()));
        }
    };

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let (Some(stem), Some(ext), Some(file_name)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|e| e.to_str()),
            path.file_name().and_then(|n| n.to_str()),
        ) else {
            continue;
        };
        let item = match ext {
            "png" => &mut series.entry(stem.to_owned()).or_default().png,
            "svg" => &mut series.entry(stem.to_owned()).or_default().svg,
            _ => continue,
        };
        *item = Some(file_name.to_owned());
    }

    Ok(series
        .into_iter()
        .map(|(name, series)| Series { name, ..series })
        .collect())
}

pub fn render_index(
    settings: &GallerySettings,
    series: &[Series],
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_template_string("index", include_str!("index.template.html"))?;

    let context = IndexContext {
        title: &settings.title,
        updated: generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        links: &settings.links,
        cards: series
            .iter()
            .filter_map(|s| s.card(&settings.plots_subdir))
            .collect(),
        footer: &settings.footer,
    };
    Ok(handlebars.render("index", &context)?)
}

/// Writes `index.html` into the docs dir for the images under its plots subdir.
///
/// Returns the number of cards on the page.
pub async fn write_index(settings: &GallerySettings) -> Result<usize> {
    let plots_dir = settings.docs_dir.join(&settings.plots_subdir);
    let series = collect_series(&plots_dir).await?;
    let html = render_index(settings, &series, Utc::now())?;

    create_dir_all(&settings.docs_dir)
        .await
        .with_context(|| format!("Create {}", settings.docs_dir.display()))?;
    let index_path = settings.docs_dir.join(INDEX_FILE);
    write(&index_path, html)
        .await
        .with_context(|| format!("Write {}", index_path.display()))?;
    info!("Wrote {} with {} cards", index_path.display(), series.len());
    Ok(series.len())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn series(name: &str, png: bool, svg: bool) -> Series {
        Series {
            name: name.to_owned(),
            png: png.then(|| format!("{name}.png")),
            svg: svg.then(|| format!("{name}.svg")),
        }
    }

    #[test]
    fn title_drops_suffix_and_underscores() {
        assert_eq!(series("fib_rec_benchmark", true, true).title(), "fib rec");
        assert_eq!(series("nbody", true, false).title(), "nbody");
    }

    #[test]
    fn card_prefers_raster_image_and_vector_link() {
        let card = series("sort_benchmark", true, true).card("plots").unwrap();
        assert_eq!(card.src, "plots/sort_benchmark.png");
        assert_eq!(card.href, "plots/sort_benchmark.svg");

        let card = series("sort_benchmark", false, true).card("plots/").unwrap();
        assert_eq!(card.src, "plots/sort_benchmark.svg");
        assert_eq!(card.href, "plots/sort_benchmark.svg");

        let card = series("sort_benchmark", true, false).card("").unwrap();
        assert_eq!(card.src, "sort_benchmark.png");
        assert_eq!(card.href, "sort_benchmark.png");

        assert!(series("empty", false, false).card("plots").is_none());
    }

    #[tokio::test]
    async fn pairs_images_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b_benchmark.png", "b_benchmark.svg", "a.svg", "notes.txt"] {
            std::fs::write(dir.path().join(file), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let found = collect_series(dir.path()).await.unwrap();
        assert_eq!(
            found,
            vec![series("a", false, true), series("b_benchmark", true, true)]
        );
    }

    #[tokio::test]
    async fn missing_plots_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_series(&dir.path().join("plots")).await.unwrap().is_empty());
    }

    #[test]
    fn renders_escaped_page() {
        let settings = GallerySettings {
            title: "Bench <&> results".to_owned(),
            links: vec![
                Link {
                    label: "Repo".to_owned(),
                    href: "https://example.org/repo".to_owned(),
                },
                Link {
                    label: "Docs".to_owned(),
                    href: "https://example.org/docs".to_owned(),
                },
            ],
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let html = render_index(&settings, &[series("sort_benchmark", true, true)], at).unwrap();

        assert!(html.contains("<title>Bench &lt;&amp;&gt; results</title>"));
        assert!(html.contains("Updated: 2025-03-04 05:06 UTC"));
        assert!(html.contains(r#"href="plots/sort_benchmark.svg""#));
        assert!(html.contains(r#"src="plots/sort_benchmark.png""#));
        assert!(html.contains(r#"<div class="card-title">sort</div>"#));
        assert!(html.contains("Repo</a>"));
        assert_eq!(html.matches("&nbsp;&bull;&nbsp;").count(), 1);
    }

    #[test]
    fn no_links_no_link_bar() {
        let html = render_index(&GallerySettings::default(), &[], Utc::now()).unwrap();
        assert!(!html.contains(r#"<div class="links">"#));
        assert!(!html.contains(r#"<a class="card""#));
    }

    #[tokio::test]
    async fn writes_index_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = GallerySettings {
            docs_dir: dir.path().join("docs"),
            ..Default::default()
        };
        std::fs::create_dir_all(settings.docs_dir.join("plots")).unwrap();
        std::fs::write(settings.docs_dir.join("plots/sort_benchmark.png"), "").unwrap();

        assert_eq!(write_index(&settings).await.unwrap(), 1);
        let html = std::fs::read_to_string(settings.docs_dir.join(INDEX_FILE)).unwrap();
        assert!(html.contains("plots/sort_benchmark.png"));
    }
}
