use crate::browser::{self, Browser, PageContext, ResourceClass};
use crate::error::Result;
use crate::filter::LinkPattern;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Knobs for loading the seed document.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub navigation_timeout: Duration,
    pub block_resources: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            block_resources: true,
        }
    }
}

/// Load `seed` in a fresh page and return every anchor reference matching
/// `pattern`, in document order. Duplicates are left for the caller.
pub async fn discover_links<B: Browser>(
    browser: &B,
    seed: &str,
    pattern: &LinkPattern,
    options: &DiscoveryOptions,
) -> Result<Vec<String>> {
    let page = browser.new_page().await?;
    let result = load_and_extract(&page, seed, options).await;
    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close discovery page for {}: {}", seed, e);
    }

    let links = result?;
    let total = links.len();
    let matched: Vec<String> = links
        .into_iter()
        .filter(|link| pattern.matches(link))
        .collect();
    ::log::info!(
        "Found {} links in {}, {} match the pattern",
        total,
        seed,
        matched.len()
    );
    Ok(matched)
}

async fn load_and_extract<P: PageContext>(
    page: &P,
    seed: &str,
    options: &DiscoveryOptions,
) -> Result<Vec<String>> {
    if options.block_resources {
        page.block_resources(&ResourceClass::LOAD_OPTIMIZED).await?;
    }
    browser::navigate(page, seed, options.navigation_timeout).await?;
    let html = page.content().await?;
    Ok(extract_links(&html, seed))
}

/// Every `href` in `html`, resolved against `base`. References that cannot
/// be resolved are kept verbatim.
pub fn extract_links(html: &str, base: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let base = Url::parse(base).ok();

    doc.select(&ANCHOR)
        .filter_map(|e| e.value().attr("href"))
        .map(|href| {
            base.as_ref()
                .and_then(|base| base.join(href).ok())
                .map(|url| url.to_string())
                .unwrap_or_else(|| href.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_resolves_relative() {
        let html = r#"<html><body>
            <a href="/docs/a">A</a>
            <a href="b#sec">B</a>
            <a href="https://other.com/x">X</a>
            <a>no href</a>
        </body></html>"#;
        let links = extract_links(html, "https://example.com/docs/");
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/a",
                "https://example.com/docs/b#sec",
                "https://other.com/x",
            ]
        );
    }

    #[test]
    fn test_extract_links_keeps_unresolvable() {
        let html = r#"<a href="http://[broken">x</a>"#;
        assert_eq!(extract_links(html, "not a base"), vec!["http://[broken"]);
    }
}
