//! Browser automation seam.
//!
//! The pipeline only talks to these traits. [`webdriver`] implements them on
//! top of a WebDriver server; tests implement them in memory.

pub mod webdriver;

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Classes of sub-resources that can be refused while a page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    Image,
    Stylesheet,
    Font,
    Media,
}

impl ResourceClass {
    /// Classes skipped during link discovery. None of them can add anchors.
    pub const LOAD_OPTIMIZED: [ResourceClass; 4] = [
        ResourceClass::Image,
        ResourceClass::Stylesheet,
        ResourceClass::Font,
        ResourceClass::Media,
    ];

    /// URL patterns matching requests of this class, with and without a query string.
    ///
    /// Matching is by file extension, so a resource served from a URL without
    /// one (image proxies, font CDNs keyed by hash) is not blocked.
    pub fn url_patterns(self) -> &'static [&'static str] {
        match self {
            ResourceClass::Image => &[
                "*.png", "*.png?*", "*.jpg", "*.jpg?*", "*.jpeg", "*.jpeg?*", "*.gif", "*.gif?*",
                "*.webp", "*.webp?*", "*.avif", "*.avif?*", "*.svg", "*.svg?*", "*.ico",
                "*.ico?*", "*.bmp", "*.bmp?*",
            ],
            ResourceClass::Stylesheet => &["*.css", "*.css?*"],
            ResourceClass::Font => &[
                "*.woff", "*.woff?*", "*.woff2", "*.woff2?*", "*.ttf", "*.ttf?*", "*.otf",
                "*.otf?*", "*.eot", "*.eot?*",
            ],
            ResourceClass::Media => &[
                "*.mp4", "*.mp4?*", "*.webm", "*.webm?*", "*.ogg", "*.ogg?*", "*.mp3", "*.mp3?*",
                "*.wav", "*.wav?*", "*.m4a", "*.m4a?*", "*.mov", "*.mov?*",
            ],
        }
    }
}

/// Page margins, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }
}

/// Layout of a printed artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    /// Paper width in inches.
    pub paper_width: f64,
    /// Paper height in inches.
    pub paper_height: f64,
    pub margins: Margins,
    pub print_background: bool,
    /// Paint a transparent default background instead of white.
    pub omit_background: bool,
    pub display_header_footer: bool,
    pub prefer_css_page_size: bool,
    pub scale: f64,
}

impl PrintOptions {
    pub const A4_WIDTH_IN: f64 = 8.27;
    pub const A4_HEIGHT_IN: f64 = 11.7;

    /// A4, 20px margins, backgrounds painted without a page colour, no decoration, 1:1.
    pub fn a4() -> Self {
        Self {
            paper_width: Self::A4_WIDTH_IN,
            paper_height: Self::A4_HEIGHT_IN,
            margins: Margins::uniform(20.0),
            print_background: true,
            omit_background: true,
            display_header_footer: false,
            prefer_css_page_size: false,
            scale: 1.0,
        }
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::a4()
    }
}

/// Opens the shared browser for one run.
pub trait BrowserLauncher {
    type Browser: Browser;

    fn launch(&self) -> impl Future<Output = Result<Self::Browser>> + Send;
}

/// Shared browser resource supporting many independent page contexts.
pub trait Browser: Send + Sync + 'static {
    type Page: PageContext;

    fn new_page(&self) -> impl Future<Output = Result<Self::Page>> + Send;

    /// Release the browser. Called exactly once, by the orchestrator.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// One page context, owned by a single task and closed by it on every path.
pub trait PageContext: Send + Sync + 'static {
    /// Refuse requests for the given classes on later navigations.
    fn block_resources(
        &self,
        classes: &[ResourceClass],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Navigate and wait for the load to settle. Deadlines are applied by callers.
    fn goto(&self, url: &str) -> impl Future<Output = Result<()>> + Send;

    /// The current rendered DOM, serialized as HTML.
    fn content(&self) -> impl Future<Output = Result<String>> + Send;

    /// Replace the whole document with `html`.
    fn replace_content(&self, html: &str) -> impl Future<Output = Result<()>> + Send;

    /// Print the current rendered state to PDF bytes.
    fn print_pdf(&self, options: &PrintOptions) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Navigate `page` to `url`, failing with `NavigationTimeout` past `deadline`.
pub async fn navigate<P: PageContext>(page: &P, url: &str, deadline: Duration) -> Result<()> {
    match tokio::time::timeout(deadline, page.goto(url)).await {
        Ok(result) => result,
        Err(_) => Err(Error::NavigationTimeout {
            url: url.to_string(),
            timeout: deadline,
        }),
    }
}
