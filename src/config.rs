use crate::browser::webdriver::WebDriverLauncher;
use crate::error::{Error, Result};
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one run, loaded from a JSON file and overridden from the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the WebDriver server (e.g. chromedriver)
    pub webdriver_url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Path to the Chrome binary, when not the driver's default
    pub browser_binary: Option<String>,

    /// Deadline for each navigation, in seconds
    pub navigation_timeout_secs: u64,

    /// Render slots; one per logical CPU when unset
    pub concurrency: Option<usize>,

    pub output_dir: PathBuf,

    /// Block images, stylesheets, fonts and media while discovering links
    pub block_resources: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            browser_binary: None,
            navigation_timeout_secs: 30,
            concurrency: None,
            output_dir: PathBuf::from("output"),
            block_resources: true,
        }
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
    }

    pub fn from_json(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Apply a `WEBDRIVER_URL` value read by the caller. Empty values are ignored.
    pub fn with_webdriver_env(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.filter(|url| !url.is_empty()) {
            self.webdriver_url = url;
        }
        self
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn launcher(&self) -> WebDriverLauncher {
        WebDriverLauncher {
            webdriver_url: self.webdriver_url.clone(),
            headless: self.headless,
            browser_binary: self.browser_binary.clone(),
            page_load_timeout: self.navigation_timeout(),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            navigation_timeout: self.navigation_timeout(),
            block_resources: self.block_resources,
        }
    }
}
