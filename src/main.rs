use clap::Parser;
use pagebind::{Config, Result, SeedRequest, slug};
use std::path::PathBuf;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match bind(&args).await {
        Ok(path) => {
            ::log::info!("Wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("pagebind failed ({:?}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn bind(args: &Args) -> Result<PathBuf> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = args.apply(config.with_webdriver_env(std::env::var("WEBDRIVER_URL").ok()));

    let request = SeedRequest::new(
        args.url.as_deref(),
        args.pattern.as_deref(),
        config.concurrency,
    )?;
    ::log::info!(
        "Binding {} with {} render slots",
        request.main_url(),
        request.concurrency()
    );
    ::log::info!("Using WebDriver at {}", config.webdriver_url);

    let document =
        pagebind::run(&config.launcher(), &request, &config.pipeline_options()).await?;

    slug::write_output(&config.output_dir, request.main_url(), &document.bytes)
}
