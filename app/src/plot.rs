use std::path::{Path, PathBuf};

use bar_chart::BarChart;
use common::{
    aggregate::BestTimes,
    config::Config,
    normalize::load_file,
    plot::{Plot, render_charts, write_plot_data},
    scan::Markers,
    util::find_result_files,
};
use eyre::Result;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct Loaded {
    pub best: BestTimes,
    pub records: usize,
    pub skipped: Vec<PathBuf>,
}

/// Reads and normalizes each file in turn. A file that cannot be read is
/// logged and skipped.
pub async fn load_results(files: &[PathBuf], markers: &Markers) -> Loaded {
    let mut loaded = Loaded::default();
    for file in files {
        match load_file(file, markers).await {
            Ok(normalized) => {
                debug!(
                    "{}: {} records via {}{}",
                    file.display(),
                    normalized.records.len(),
                    normalized.strategy.name(),
                    if normalized.degraded { " (degraded)" } else { "" }
                );
                loaded.records += normalized.records.len();
                loaded.best.extend(normalized.records);
            }
            Err(err) => {
                warn!("Failed to parse {}: {err}", file.display());
                loaded.skipped.push(file.clone());
            }
        }
    }
    loaded
}

fn plots_or_default(plots: Vec<Box<dyn Plot>>) -> Vec<Box<dyn Plot>> {
    if plots.is_empty() {
        vec![Box::new(BarChart::default())]
    } else {
        plots
    }
}

pub async fn run_plot(config: Config) -> Result<()> {
    let files = find_result_files(&config.results_dir, &config.extensions);
    if files.is_empty() {
        info!("No result files in {}", config.results_dir.display());
        println!("No result files found in {}", config.results_dir.display());
        return Ok(());
    }

    let markers = Markers::new()?;
    let loaded = load_results(&files, &markers).await;
    if loaded.best.is_empty() {
        info!("No usable data after normalization");
        println!("No usable data after normalization");
        return Ok(());
    }

    let charts = loaded.best.charts();
    let out_dir = config.out_dir.clone();
    let plots = plots_or_default(config.plots);
    let plot_data = config.plot_data;
    let chart_count = charts.len();
    let summary = spawn_blocking(move || {
        let summary = render_charts(&plots, &charts, &out_dir)?;
        if plot_data {
            write_plot_data(&charts, &out_dir)?;
        }
        Ok::<_, eyre::Report>(summary)
    })
    .await??;

    println!(
        "files={} skipped={} records={} charts={chart_count} written={} failed={}",
        files.len(),
        loaded.skipped.len(),
        loaded.records,
        summary.written.len(),
        summary.failed,
    );
    Ok(())
}

pub async fn list_results(config: &Config) -> Result<()> {
    let files = find_result_files(&config.results_dir, &config.extensions);
    if files.is_empty() {
        println!("No result files found in {}", config.results_dir.display());
        return Ok(());
    }

    let markers = Markers::new()?;
    for file in &files {
        println!("{}", describe(file, &markers).await);
    }
    Ok(())
}

async fn describe(file: &Path, markers: &Markers) -> String {
    match load_file(file, markers).await {
        Ok(normalized) => format!(
            "{} -> {}{} {} records",
            file.display(),
            normalized.strategy.name(),
            if normalized.degraded { " (degraded)" } else { "" },
            normalized.records.len()
        ),
        Err(err) => format!("{} -> {err}", file.display()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn sample_config_parses() {
        let config = Config::from_yaml(include_str!("../../bench-plot.yaml")).unwrap();
        assert_eq!(config.plots.len(), 1);
        assert_eq!(config.plots[0].name(), "bar-chart");
        assert_eq!(config.gallery.links.len(), 3);
    }

    #[tokio::test]
    async fn merges_tabular_and_log_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("file1.csv"),
            "task,impl,avg_ns\nsort,tenge(pdq),120\n",
        )
        .unwrap();
        fs::write(dir.path().join("file2.txt"), "TASK=sort\nrun rust TIME_NS=95\n").unwrap();

        let files = find_result_files(dir.path(), &Config::default().extensions);
        let loaded = load_results(&files, &Markers::new().unwrap()).await;
        assert_eq!(loaded.records, 2);
        assert!(loaded.skipped.is_empty());

        let charts = loaded.best.charts();
        assert_eq!(charts.len(), 1);
        assert_eq!(
            charts[0].bars,
            vec![("tenge(pdq)".to_owned(), 120), ("rust".to_owned(), 95)]
        );
    }

    #[tokio::test]
    async fn describes_how_each_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("table.csv");
        let odd = dir.path().join("odd.csv");
        let log = dir.path().join("run.log");
        fs::write(&table, "task,impl,avg_ns\nsort,c,10\nsort,go,12\nsort,rust,n/a\n").unwrap();
        fs::write(&odd, "label,whatever\nTASK=fib_rec,1\nTIME_NS=33 tenge,2\n").unwrap();
        fs::write(
            &log,
            "TASK=sort\nrun rust, TIME_NS=95\nrun go, TIME_NS=90\nrun c, TIME_NS=80\n",
        )
        .unwrap();
        let markers = Markers::new().unwrap();

        assert_eq!(
            describe(&table, &markers).await,
            format!("{} -> tabular 2 records", table.display())
        );
        assert_eq!(
            describe(&odd, &markers).await,
            format!("{} -> raw-text (degraded) 1 records", odd.display())
        );
        assert_eq!(
            describe(&log, &markers).await,
            format!("{} -> raw-text 3 records", log.display())
        );

        let gone = dir.path().join("gone.csv");
        let described = describe(&gone, &markers).await;
        assert!(described.starts_with(&format!(
            "{} -> Could not read {}",
            gone.display(),
            gone.display()
        )));
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok.csv"), "task,time_ns\nfib_iter,4\n").unwrap();
        let files = vec![dir.path().join("gone.csv"), dir.path().join("ok.csv")];

        let loaded = load_results(&files, &Markers::new().unwrap()).await;
        assert_eq!(loaded.skipped, vec![dir.path().join("gone.csv")]);
        assert_eq!(loaded.best.get("fib_iter", "fib_iter"), Some(4));
    }

    #[tokio::test]
    async fn no_input_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            results_dir: dir.path().join("results"),
            out_dir: dir.path().join("plots"),
            ..Default::default()
        };
        run_plot(config).await.unwrap();
        assert!(!dir.path().join("plots").exists());
    }

    #[tokio::test]
    async fn no_usable_data_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("results")).unwrap();
        fs::write(dir.path().join("results/noise.log"), "nothing to see\n").unwrap();
        let config = Config {
            results_dir: dir.path().join("results"),
            out_dir: dir.path().join("plots"),
            ..Default::default()
        };
        run_plot(config).await.unwrap();
        assert!(!dir.path().join("plots").exists());
    }

    #[tokio::test]
    async fn renders_one_chart_pair_per_group() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("results")).unwrap();
        fs::write(
            dir.path().join("results/all.csv"),
            "task,impl,time_ns\nquicksort,c,10\nnbody_sym_x,go(sym),30\nnbody,rust,20\n",
        )
        .unwrap();
        let config = Config {
            results_dir: dir.path().join("results"),
            out_dir: dir.path().join("plots"),
            plot_data: true,
            ..Default::default()
        };
        run_plot(config).await.unwrap();

        for stem in ["sort_benchmark", "nbody_benchmark", "nbody_sym_benchmark"] {
            assert!(dir.path().join(format!("plots/{stem}.png")).exists());
            assert!(dir.path().join(format!("plots/{stem}.svg")).exists());
            assert!(dir.path().join(format!("plots/plot_data/{stem}.json")).exists());
        }
    }
}
