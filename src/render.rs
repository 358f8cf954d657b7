use crate::browser::{self, Browser, PageContext, PrintOptions};
use crate::error::{Error, Result};
use crate::sanitizer;
use std::time::Duration;

/// The paginated document produced for one entry of the document list.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub source: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl PageArtifact {
    /// Wrap printed bytes, reading the page count from the PDF itself.
    pub fn from_pdf(source: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let source = source.into();
        let page_count = count_pages(&bytes).map_err(|e| Error::render(&source, e))?;
        if page_count == 0 {
            return Err(Error::render(&source, "printed document has no pages"));
        }
        Ok(Self {
            source,
            bytes,
            page_count,
        })
    }
}

pub fn count_pages(bytes: &[u8]) -> std::result::Result<usize, lopdf::Error> {
    Ok(lopdf::Document::load_mem(bytes)?.get_pages().len())
}

/// Load, sanitize and print one document in its own page context.
///
/// The page is closed before returning, whether or not rendering succeeded.
pub async fn render_document<B: Browser>(
    browser: &B,
    url: &str,
    navigation_timeout: Duration,
) -> Result<PageArtifact> {
    let page = browser.new_page().await?;
    let result = load_and_print(&page, url, navigation_timeout).await;
    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close page for {}: {}", url, e);
    }
    PageArtifact::from_pdf(url, result?)
}

async fn load_and_print<P: PageContext>(
    page: &P,
    url: &str,
    navigation_timeout: Duration,
) -> Result<Vec<u8>> {
    browser::navigate(page, url, navigation_timeout).await?;

    let html = page.content().await.map_err(|e| Error::render(url, e))?;
    let sanitized = sanitizer::sanitize_html(&html, url);
    page.replace_content(&sanitized.to_html())
        .await
        .map_err(|e| Error::render(url, e))?;

    page.print_pdf(&PrintOptions::a4())
        .await
        .map_err(|e| Error::render(url, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserLauncher, Margins};
    use crate::error::ErrorKind;
    use crate::testing::{FakeLauncher, FakeSite, sample_pdf};
    use std::sync::atomic::Ordering;

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_prints_with_fixed_layout() {
        let launcher = FakeLauncher::new(FakeSite::new().page_count("https://a/doc", 3));
        let browser = launcher.launch().await.unwrap();

        let artifact = render_document(&browser, "https://a/doc", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(artifact.source, "https://a/doc");
        assert_eq!(artifact.page_count, 3);

        let printed = launcher.stats.print_options.lock().unwrap().clone();
        assert_eq!(printed, vec![PrintOptions::a4()]);
        let options = &printed[0];
        assert_eq!(
            (options.paper_width, options.paper_height),
            (PrintOptions::A4_WIDTH_IN, PrintOptions::A4_HEIGHT_IN)
        );
        assert_eq!(options.margins, Margins::uniform(20.0));
        assert!(options.print_background);
        assert!(options.omit_background);
        assert!(!options.display_header_footer);
        assert!(!options.prefer_css_page_size);
        assert_eq!(options.scale, 1.0);
    }

    #[tokio::test]
    async fn test_page_closed_on_failure() {
        let site = FakeSite::new().fail_print("https://a/doc").hang("https://a/slow");
        let launcher = FakeLauncher::new(site);
        let browser = launcher.launch().await.unwrap();

        let err = render_document(&browser, "https://a/doc", TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderFailure);

        let err = render_document(&browser, "https://a/slow", TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NavigationTimeout);

        assert_eq!(launcher.stats.pages_opened.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.stats.open_pages.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_artifact_requires_pages() {
        let artifact = PageArtifact::from_pdf("https://a", sample_pdf("a", 2)).unwrap();
        assert_eq!(artifact.page_count, 2);

        let err = PageArtifact::from_pdf("https://a", sample_pdf("a", 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderFailure);

        let err = PageArtifact::from_pdf("https://a", b"garbage".to_vec()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderFailure);
    }
}
