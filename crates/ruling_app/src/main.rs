mod cli;
mod logging;
mod progress;
mod settings;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ruling_engine::{run_window, ChromiumFactory};
use ruling_logging::{crawl_error, crawl_info};

use cli::Args;
use progress::LogProgressSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::initialize(args.log_destination(), args.level());

    let result = run(args).await;
    if let Err(err) = &result {
        crawl_error!("run failed: {err:#}");
    }
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let window = args.window()?;
    let config = settings::load(args.config.as_deref())?;
    crawl_info!(
        "crawling {}..{} into {}",
        window.start(),
        window.end(),
        args.destination.display()
    );

    let factory = Arc::new(ChromiumFactory::new(config.browser.clone()));
    let summary = run_window(
        config,
        factory,
        args.destination.clone(),
        &window,
        Arc::new(LogProgressSink),
    )
    .await
    .with_context(|| format!("crawl of {}..{} failed", window.start(), window.end()))?;

    crawl_info!("finished: {summary}");
    Ok(())
}
