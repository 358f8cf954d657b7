use clap::Parser;
use pagebind::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagebind")]
#[command(about = "Bind a documentation page and the pages it links to into one PDF")]
#[command(version)]
pub struct Args {
    /// Seed URL; its linked pages are rendered after it
    pub url: Option<String>,

    /// Regex a discovered link must match (default: starts with the seed URL)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Number of pages rendered at once (default: one per CPU)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the PDF is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,
}

impl Args {
    /// Flags override whatever the config file and environment set.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = Some(concurrency);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        config
    }
}
