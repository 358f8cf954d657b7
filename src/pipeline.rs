//! End-to-end run: seed → discovered links → rendered artifacts → one document.

use crate::assemble::{self, AssembledDocument};
use crate::browser::{Browser, BrowserLauncher};
use crate::discover::{self, DiscoveryOptions};
use crate::error::{Error, Result};
use crate::filter::LinkPattern;
use crate::limiter::{ConcurrencyLimiter, TaskPool, default_concurrency};
use crate::render::{self, PageArtifact};
use crate::url_norm::DocumentList;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Immutable description of one run, built once at the boundary.
#[derive(Debug, Clone)]
pub struct SeedRequest {
    main_url: String,
    pattern: LinkPattern,
    concurrency: usize,
}

impl SeedRequest {
    /// Validate the raw inputs. The pattern is compiled here, before any
    /// browser work can start.
    pub fn new(
        main_url: Option<&str>,
        pattern: Option<&str>,
        concurrency: Option<usize>,
    ) -> Result<Self> {
        let main_url = main_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(Error::MissingArgument("seed URL"))?;
        let pattern = LinkPattern::for_seed(main_url, pattern)?;
        let concurrency = concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(default_concurrency);

        Ok(Self {
            main_url: main_url.to_string(),
            pattern,
            concurrency,
        })
    }

    pub fn main_url(&self) -> &str {
        &self.main_url
    }

    pub fn pattern(&self) -> &LinkPattern {
        &self.pattern
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Settings that do not describe the request itself.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub navigation_timeout: Duration,
    pub block_resources: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            block_resources: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    BrowserAcquired,
    SeedLoaded,
    LinksDiscovered,
    ListNormalized,
    Rendering,
    Assembling,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }
}

/// Records the run's progress through [`PipelineState`].
#[derive(Debug)]
struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: PipelineState::Init,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(!self.state.is_terminal(), "no transitions out of {:?}", self.state);
        ::log::debug!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: &Error) {
        ::log::error!(
            "Pipeline failed in {:?} ({:?}): {}",
            self.state,
            error.kind(),
            error
        );
        self.state = PipelineState::Failed;
    }
}

/// Run the whole pipeline, returning the assembled document.
///
/// The browser is released before this returns, on success and on failure.
pub async fn run<L: BrowserLauncher>(
    launcher: &L,
    request: &SeedRequest,
    options: &PipelineOptions,
) -> Result<AssembledDocument> {
    let mut tracker = StateTracker::new();

    let browser = match launcher.launch().await {
        Ok(browser) => Arc::new(browser),
        Err(e) => {
            tracker.fail(&e);
            return Err(e);
        }
    };
    tracker.advance(PipelineState::BrowserAcquired);

    let result = run_with_browser(&browser, request, options, &mut tracker).await;

    if let Err(e) = browser.close().await {
        ::log::warn!("Failed to release browser: {}", e);
    }

    match result {
        Ok(document) => {
            tracker.advance(PipelineState::Succeeded);
            Ok(document)
        }
        Err(e) => {
            tracker.fail(&e);
            Err(e)
        }
    }
}

async fn run_with_browser<B: Browser>(
    browser: &Arc<B>,
    request: &SeedRequest,
    options: &PipelineOptions,
    tracker: &mut StateTracker,
) -> Result<AssembledDocument> {
    let discovery = DiscoveryOptions {
        navigation_timeout: options.navigation_timeout,
        block_resources: options.block_resources,
    };
    let links = discover::discover_links(
        browser.as_ref(),
        request.main_url(),
        request.pattern(),
        &discovery,
    )
    .await?;
    tracker.advance(PipelineState::SeedLoaded);
    tracker.advance(PipelineState::LinksDiscovered);

    let list = DocumentList::new(request.main_url(), &links);
    ::log::info!("Rendering {} documents", list.len());
    tracker.advance(PipelineState::ListNormalized);

    tracker.advance(PipelineState::Rendering);
    let artifacts = render_all(browser, &list, request.concurrency(), options).await?;

    tracker.advance(PipelineState::Assembling);
    let document = assemble::assemble(&list, &artifacts)?;
    ::log::info!(
        "Assembled {} pages from {} documents",
        document.page_count,
        list.len()
    );
    Ok(document)
}

/// Raises the shared stop flag when dropped while armed, including when the
/// owning task unwinds from a panic.
struct StopOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl StopOnDrop {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Render every list entry under the concurrency bound and return the
/// artifacts in list order. Once a task has failed no further tasks are
/// started, but tasks already running are left to finish.
async fn render_all<B: Browser>(
    browser: &Arc<B>,
    list: &DocumentList,
    concurrency: usize,
    options: &PipelineOptions,
) -> Result<Vec<PageArtifact>> {
    let total = list.len();
    let failed = Arc::new(AtomicBool::new(false));
    let mut pool = TaskPool::new(ConcurrencyLimiter::new(concurrency));
    let mut submit_error = None;

    for (i, url) in list.iter().enumerate() {
        if failed.load(Ordering::SeqCst) {
            ::log::debug!("Not starting {} after an earlier failure", url);
            break;
        }

        let browser = Arc::clone(browser);
        let task_failed = Arc::clone(&failed);
        let source = url.to_string();
        let timeout = options.navigation_timeout;
        let submitted = pool
            .submit(async move {
                // A slot may free up because the task holding it failed
                if task_failed.load(Ordering::SeqCst) {
                    ::log::debug!("Skipping {} after an earlier failure", source);
                    return Ok(None);
                }
                let mut guard = StopOnDrop::new(task_failed);
                let result = render::render_document(browser.as_ref(), &source, timeout).await;
                if let Ok(artifact) = &result {
                    guard.disarm();
                    ::log::info!(
                        "Rendered {}/{}: {} ({} pages)",
                        i + 1,
                        total,
                        source,
                        artifact.page_count
                    );
                }
                result.map(Some)
            })
            .await;
        if let Err(e) = submitted {
            failed.store(true, Ordering::SeqCst);
            submit_error = Some(Error::render(url, e));
            break;
        }
    }

    let mut artifacts = Vec::with_capacity(total);
    let mut first_error = None;
    for (url, joined) in list.iter().zip(pool.join().await) {
        match joined {
            Ok(Ok(Some(artifact))) => artifacts.push(artifact),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(Error::render(url, e));
            }
        }
    }
    match first_error.or(submit_error) {
        Some(e) => Err(e),
        None if artifacts.len() == total => Ok(artifacts),
        None => Err(Error::render(list.seed(), "rendering stopped early")),
    }
}
