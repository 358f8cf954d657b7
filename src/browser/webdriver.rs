//! [`Browser`] on a WebDriver server (chromedriver).
//!
//! Every page context is its own WebDriver session, so contexts never share a
//! current window. Resource blocking, transparent backgrounds and printing go
//! through chromedriver's Chrome DevTools passthrough endpoint.

use super::{Browser, BrowserLauncher, PageContext, PrintOptions, ResourceClass};
use crate::error::{Error, Result};
use base64::Engine;
use fantoccini::wd::{TimeoutConfiguration, WebDriverCompatibleCommand};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Alternative endpoints tried when the configured one refuses a session.
const FALLBACK_WEBDRIVER_URLS: &[&str] = &["http://localhost:9515", "http://127.0.0.1:4444"];

const CSS_PX_PER_INCH: f64 = 96.0;

/// Interval between checks of the resource count while waiting for network quiet.
const QUIET_POLL: Duration = Duration::from_millis(250);

/// Consecutive unchanged polls that count as network quiet.
const QUIET_POLLS: u32 = 2;

/// How sessions are created on the WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    pub webdriver_url: String,
    pub headless: bool,
    pub browser_binary: Option<String>,
    pub page_load_timeout: Duration,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless: true,
            browser_binary: None,
            page_load_timeout: Duration::from_secs(30),
        }
    }

    fn capabilities(&self) -> serde_json::Map<String, Value> {
        let mut args = vec!["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];
        if self.headless {
            args.push("--headless=new");
        }

        let mut chrome_options = json!({ "args": args });
        if let Some(binary) = &self.browser_binary {
            chrome_options["binary"] = json!(binary);
        }

        let mut caps = serde_json::Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), chrome_options);
        caps
    }
}

/// Session settings shared by the browser and all of its page contexts.
#[derive(Debug)]
struct SessionSettings {
    webdriver_url: String,
    capabilities: serde_json::Map<String, Value>,
    page_load_timeout: Duration,
}

impl SessionSettings {
    async fn connect(&self) -> Result<Client> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities.clone())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                Error::browser(format!(
                    "failed to create session at {}: {}",
                    self.webdriver_url, e
                ))
            })?;

        let timeouts = TimeoutConfiguration::new(None, Some(self.page_load_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            ::log::warn!("Failed to set page load timeout: {}", e);
        }
        Ok(client)
    }
}

impl BrowserLauncher for WebDriverLauncher {
    type Browser = WebDriverBrowser;

    async fn launch(&self) -> Result<WebDriverBrowser> {
        let mut candidates = vec![self.webdriver_url.clone()];
        candidates.extend(
            FALLBACK_WEBDRIVER_URLS
                .iter()
                .filter(|url| **url != self.webdriver_url)
                .map(|url| url.to_string()),
        );

        let mut last_error = None;
        for webdriver_url in candidates {
            let settings = SessionSettings {
                webdriver_url,
                capabilities: self.capabilities(),
                page_load_timeout: self.page_load_timeout,
            };
            match settings.connect().await {
                Ok(root) => {
                    ::log::debug!("Connected to WebDriver at {}", settings.webdriver_url);
                    return Ok(WebDriverBrowser {
                        settings: Arc::new(settings),
                        root,
                    });
                }
                Err(e) => {
                    ::log::debug!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(last_error.unwrap_or_else(|| Error::browser("no WebDriver endpoint configured")))
    }
}

/// The run's browser. Its root session proves the server is reachable and
/// is what gets closed at the end.
pub struct WebDriverBrowser {
    settings: Arc<SessionSettings>,
    root: Client,
}

impl Browser for WebDriverBrowser {
    type Page = WebDriverPage;

    async fn new_page(&self) -> Result<WebDriverPage> {
        let client = self.settings.connect().await?;
        Ok(WebDriverPage { client })
    }

    async fn close(&self) -> Result<()> {
        self.root
            .clone()
            .close()
            .await
            .map_err(|e| Error::browser(format!("failed to close browser: {e}")))
    }
}

pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    async fn cdp(&self, cmd: &'static str, params: Value) -> Result<Value> {
        self.client
            .issue_cmd(CdpCommand { cmd, params })
            .await
            .map_err(|e| Error::browser(format!("{cmd} failed: {e}")))
    }

    async fn resource_count(&self) -> Result<u64> {
        let value = self
            .client
            .execute(
                "return performance.getEntriesByType('resource').length;",
                vec![],
            )
            .await
            .map_err(Error::browser)?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Poll until no new resource entries appear for a few intervals.
    async fn wait_for_network_quiet(&self) -> Result<()> {
        let mut last = self.resource_count().await?;
        let mut stable = 0;
        while stable < QUIET_POLLS {
            tokio::time::sleep(QUIET_POLL).await;
            let current = self.resource_count().await?;
            if current == last {
                stable += 1;
            } else {
                stable = 0;
                last = current;
            }
        }
        Ok(())
    }
}

impl PageContext for WebDriverPage {
    async fn block_resources(&self, classes: &[ResourceClass]) -> Result<()> {
        let urls: Vec<&str> = classes
            .iter()
            .flat_map(|class| class.url_patterns().iter().copied())
            .collect();
        self.cdp("Network.enable", json!({})).await?;
        self.cdp("Network.setBlockedURLs", json!({ "urls": urls }))
            .await?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| Error::browser(format!("failed to load {url}: {e}")))?;
        self.wait_for_network_quiet().await
    }

    async fn content(&self) -> Result<String> {
        self.client.source().await.map_err(Error::browser)
    }

    async fn replace_content(&self, html: &str) -> Result<()> {
        self.client
            .execute(
                "const doc = new DOMParser().parseFromString(arguments[0], 'text/html');\
                 document.replaceChild(document.adoptNode(doc.documentElement), document.documentElement);",
                vec![json!(html)],
            )
            .await
            .map_err(Error::browser)?;
        Ok(())
    }

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        if options.omit_background {
            self.cdp(
                "Emulation.setDefaultBackgroundColorOverride",
                json!({ "color": { "r": 0, "g": 0, "b": 0, "a": 0 } }),
            )
            .await?;
        }

        let value = self
            .cdp("Page.printToPDF", print_to_pdf_params(options))
            .await?;

        let data = value
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::browser("Page.printToPDF returned no data"))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::browser(format!("invalid PDF payload: {e}")))
    }

    async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| Error::browser(format!("failed to close page: {e}")))
    }
}

/// `Page.printToPDF` parameters. Margins are converted from CSS pixels to inches.
fn print_to_pdf_params(options: &PrintOptions) -> Value {
    let margins = &options.margins;
    json!({
        "paperWidth": options.paper_width,
        "paperHeight": options.paper_height,
        "marginTop": margins.top / CSS_PX_PER_INCH,
        "marginRight": margins.right / CSS_PX_PER_INCH,
        "marginBottom": margins.bottom / CSS_PX_PER_INCH,
        "marginLeft": margins.left / CSS_PX_PER_INCH,
        "printBackground": options.print_background,
        "displayHeaderFooter": options.display_header_footer,
        "preferCSSPageSize": options.prefer_css_page_size,
        "scale": options.scale,
    })
}

/// A Chrome DevTools command sent through chromedriver's passthrough endpoint.
#[derive(Debug)]
struct CdpCommand {
    cmd: &'static str,
    params: Value,
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> std::result::Result<url::Url, url::ParseError> {
        let session_id = session_id.unwrap_or_default();
        base_url.join(&format!("session/{session_id}/goog/cdp/execute"))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params });
        (http::Method::POST, Some(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_headless() {
        let launcher = WebDriverLauncher::new("http://localhost:4444");
        let caps = launcher.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(caps["goog:chromeOptions"].get("binary").is_none());
    }

    #[test]
    fn test_capabilities_binary_and_headed() {
        let mut launcher = WebDriverLauncher::new("http://localhost:4444");
        launcher.headless = false;
        launcher.browser_binary = Some("/opt/chrome/chrome".to_string());
        let caps = launcher.capabilities();
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a == "--headless=new"));
        assert_eq!(caps["goog:chromeOptions"]["binary"], "/opt/chrome/chrome");
    }

    #[test]
    fn test_print_params_for_a4() {
        let params = print_to_pdf_params(&PrintOptions::a4());
        assert_eq!(params["paperWidth"], 8.27);
        assert_eq!(params["paperHeight"], 11.7);
        for side in ["marginTop", "marginRight", "marginBottom", "marginLeft"] {
            assert_eq!(params[side], 20.0 / 96.0, "{side}");
        }
        assert_eq!(params["printBackground"], true);
        assert_eq!(params["displayHeaderFooter"], false);
        assert_eq!(params["preferCSSPageSize"], false);
        assert_eq!(params["scale"], 1.0);
    }

    #[test]
    fn test_block_patterns_cover_classes() {
        let patterns: Vec<&str> = ResourceClass::LOAD_OPTIMIZED
            .iter()
            .flat_map(|class| class.url_patterns().iter().copied())
            .collect();
        for expected in ["*.png", "*.png?*", "*.css", "*.woff2", "*.mp4?*"] {
            assert!(patterns.contains(&expected), "{expected}");
        }
    }

    #[test]
    fn test_cdp_endpoint() {
        let cmd = CdpCommand {
            cmd: "Page.printToPDF",
            params: json!({}),
        };
        let base = url::Url::parse("http://localhost:9515/").unwrap();
        let endpoint = cmd.endpoint(&base, Some("abc")).unwrap();
        assert_eq!(
            endpoint.as_str(),
            "http://localhost:9515/session/abc/goog/cdp/execute"
        );
        let (method, body) = cmd.method_and_body(&endpoint);
        assert_eq!(method, http::Method::POST);
        assert!(body.unwrap().contains("\"cmd\":\"Page.printToPDF\""));
    }
}
