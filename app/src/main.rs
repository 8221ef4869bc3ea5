use std::path::PathBuf;

use clap::{Parser, Subcommand};
use common::config::Config;
use eyre::Result;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod plot;

const MODULES: &[&str] = &["common", "gallery", "bar_chart"];

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file, bench-plot.yaml is used when present
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse result files and render one chart per task group
    Plot {
        /// Directory searched recursively for result files
        #[arg(short, long)]
        results: Option<PathBuf>,
        /// Directory the charts are written to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate the gallery page for rendered charts
    Index {
        /// Directory the page is written to, charts are read from its plots subdir
        #[arg(short, long)]
        docs: Option<PathBuf>,
    },
    /// List result files and how each of them parses
    Ls {
        #[arg(short, long)]
        results: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("info".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "bench-plot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_plot={log_level}"));

    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(layer().with_ansi(false).with_writer(non_blocking))
        .init();

    let mut config = Config::load(args.config.as_deref()).await?;
    let result = match args.command {
        Commands::Plot { results, out } => {
            if let Some(results) = results {
                config.results_dir = results;
            }
            if let Some(out) = out {
                config.out_dir = out;
            }
            plot::run_plot(config).await
        }
        Commands::Index { docs } => {
            if let Some(docs) = docs {
                config.gallery.docs_dir = docs;
            }
            let cards = gallery::write_index(&config.gallery).await?;
            println!(
                "Wrote {} with {cards} cards",
                config.gallery.docs_dir.join(gallery::INDEX_FILE).display()
            );
            Ok(())
        }
        Commands::Ls { results } => {
            if let Some(results) = results {
                config.results_dir = results;
            }
            plot::list_results(&config).await
        }
    };

    if let Err(err) = &result {
        error!("{err:#?}");
    }
    result
}
