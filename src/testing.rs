//! In-memory browser and PDF fixtures shared by unit tests.

use crate::browser::{Browser, BrowserLauncher, PageContext, PrintOptions, ResourceClass};
use crate::error::{Error, Result};
use crate::url_norm::normalize_url;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A PDF with `pages` pages. Each page carries a `PagebindTag` entry of
/// `"{tag}-{n}"`, and `MediaBox`/`Resources` are inherited from the page tree.
pub fn sample_pdf(tag: &str, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("{tag} page {n}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "PagebindTag" => Object::string_literal(format!("{tag}-{n}")),
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Canned responses keyed by normalized URL.
#[derive(Debug, Default)]
pub struct FakeSite {
    html: HashMap<String, String>,
    page_counts: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    hanging: HashSet<String>,
    print_failures: HashSet<String>,
    panics: HashSet<String>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.html.insert(normalize_url(url), html.to_string());
        self
    }

    pub fn page_count(mut self, url: &str, pages: usize) -> Self {
        self.page_counts.insert(normalize_url(url), pages);
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(normalize_url(url), delay);
        self
    }

    /// Navigation to `url` never completes.
    pub fn hang(mut self, url: &str) -> Self {
        self.hanging.insert(normalize_url(url));
        self
    }

    /// Navigation to `url` panics inside the render task.
    pub fn panic_on_load(mut self, url: &str) -> Self {
        self.panics.insert(normalize_url(url));
        self
    }

    pub fn fail_print(mut self, url: &str) -> Self {
        self.print_failures.insert(normalize_url(url));
        self
    }
}

/// What the fake browser observed during a run.
#[derive(Debug, Default)]
pub struct Stats {
    pub launches: AtomicUsize,
    pub browser_closed: AtomicBool,
    pub pages_opened: AtomicUsize,
    pub open_pages: AtomicUsize,
    pub peak_open_pages: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub blocked: Mutex<Vec<ResourceClass>>,
    pub printed_html: Mutex<Vec<String>>,
    pub print_options: Mutex<Vec<PrintOptions>>,
}

impl Stats {
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

pub struct FakeLauncher {
    pub site: Arc<FakeSite>,
    pub stats: Arc<Stats>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            stats: Arc::new(Stats::default()),
        }
    }
}

impl BrowserLauncher for FakeLauncher {
    type Browser = FakeBrowser;

    async fn launch(&self) -> Result<FakeBrowser> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBrowser {
            site: Arc::clone(&self.site),
            stats: Arc::clone(&self.stats),
        })
    }
}

pub struct FakeBrowser {
    site: Arc<FakeSite>,
    stats: Arc<Stats>,
}

impl Browser for FakeBrowser {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        let open = self.stats.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_open_pages.fetch_max(open, Ordering::SeqCst);
        Ok(FakePage {
            site: Arc::clone(&self.site),
            stats: Arc::clone(&self.stats),
            current: Mutex::new(None),
        })
    }

    async fn close(&self) -> Result<()> {
        self.stats.browser_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    stats: Arc<Stats>,
    current: Mutex<Option<(String, String)>>,
}

impl FakePage {
    fn current_url(&self) -> Result<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(url, _)| url.clone())
            .ok_or_else(|| Error::browser("no document loaded"))
    }
}

impl PageContext for FakePage {
    async fn block_resources(&self, classes: &[ResourceClass]) -> Result<()> {
        self.stats.blocked.lock().unwrap().extend_from_slice(classes);
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let key = normalize_url(url);
        self.stats.navigations.lock().unwrap().push(key.clone());

        if self.site.panics.contains(&key) {
            panic!("renderer crashed on {key}");
        }
        if self.site.hanging.contains(&key) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.site.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }

        let html = self
            .site
            .html
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("<html><body><h1>{key}</h1><p>Body of {key}</p></body></html>"));
        *self.current.lock().unwrap() = Some((key, html));
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, html)| html.clone())
            .ok_or_else(|| Error::browser("no document loaded"))
    }

    async fn replace_content(&self, html: &str) -> Result<()> {
        let url = self.current_url()?;
        *self.current.lock().unwrap() = Some((url, html.to_string()));
        Ok(())
    }

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        self.stats.print_options.lock().unwrap().push(options.clone());
        let url = self.current_url()?;
        if self.site.print_failures.contains(&url) {
            return Err(Error::browser("target crashed"));
        }
        let html = self.content().await?;
        self.stats.printed_html.lock().unwrap().push(html);
        let pages = self.site.page_counts.get(&url).copied().unwrap_or(1);
        Ok(sample_pdf(&url, pages))
    }

    async fn close(self) -> Result<()> {
        self.stats.open_pages.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
