// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Load the settings file and create the output directory
// 3. Ask the site how many pages it really has (optional)
// 4. Hand everything to the supervisor, which runs the worker pool
// 5. Print the summary and exit (0 = all pages ok, 1 = some failed, 2 = error)
//
// main() is a plain blocking function on purpose: the supervisor waits on the
// task queue with a condition variable, and every async-mode worker builds its
// own runtime on its own thread.
// =============================================================================

mod cli;
mod fetch;
mod job;
mod pool;
mod queue;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use fetch::HttpFetcher;
use pool::{resolve_worker_count, Supervisor, SupervisorConfig, SupervisorState};
use settings::Settings;

fn main() {
    init_tracing();

    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so stdout only carries the summary
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.settings)?;
    std::fs::create_dir_all(&settings.out_dir).with_context(|| {
        format!(
            "creating output directory {}",
            settings.out_dir.display()
        )
    })?;

    let fetcher = HttpFetcher::new(&settings);

    if settings.probe_page_count && settings.total_pages > 0 {
        match fetcher.probe_page_count() {
            Ok(on_site) if on_site < settings.total_pages => {
                info!(
                    "site only has {} page(s), lowering from {}",
                    on_site, settings.total_pages
                );
                settings.total_pages = on_site;
            }
            Ok(_) => {}
            Err(e) => warn!("could not read the page count, keeping {}: {}", settings.total_pages, e),
        }
    }

    info!("Processing {} {} pages", cli.mode, settings.total_pages);

    let config = SupervisorConfig {
        total_pages: settings.total_pages,
        workers: resolve_worker_count(cli.process, num_cpus::get()),
        mode: cli.mode,
        concurrency: usize::from(cli.concurrency),
        out_dir: settings.out_dir.clone(),
    };
    let mut supervisor = Supervisor::new(config, fetcher);
    let summary = supervisor.run()?;
    debug_assert_eq!(supervisor.state(), SupervisorState::Reported);

    info!("{}", summary);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(if summary.failed > 0 { 1 } else { 0 })
}
