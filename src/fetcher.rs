// 🌐 Page Fetcher - headless Chromium over CDP
// Launch -> navigate -> settle -> read document.body.innerText -> close

use crate::error::FetchError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The verification page renders client-side and never signals completion
pub const SETTLE_DELAY: Duration = Duration::from_secs(15);
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Anything that can turn a URL into the visible text of the rendered page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fixed browser settings. Only the executable path comes from config.
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub settle_delay: Duration,
    pub page_load_timeout: Duration,
    pub user_agent: String,
    pub window: (u32, u32),
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            page_load_timeout: PAGE_LOAD_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            window: WINDOW_SIZE,
            chrome_executable: None,
        }
    }
}

impl FetcherSettings {
    pub fn with_chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.chrome_executable = path;
        self
    }
}

// ============================================================================
// SCOPED SESSION
// ============================================================================

/// One live browser. `release` must run on every exit path.
#[async_trait]
pub(crate) trait BrowserSession: Send + Sized {
    async fn read_text(&mut self, url: &str, settings: &FetcherSettings)
        -> Result<String, FetchError>;

    async fn release(self);
}

/// Read the page, then release the session whatever the outcome.
pub(crate) async fn read_then_release<S: BrowserSession>(
    mut session: S,
    url: &str,
    settings: &FetcherSettings,
) -> Result<String, FetchError> {
    let result = session.read_text(url, settings).await;
    session.release().await;
    result
}

/// Fresh Chrome profile per session. A shared profile makes a second
/// concurrent launch hand off to the running browser and exit.
fn new_profile_dir() -> Result<TempDir, FetchError> {
    tempfile::Builder::new()
        .prefix("marbete-chrome-")
        .tempdir()
        .map_err(|e| FetchError::Launch(format!("could not create browser profile: {}", e)))
}

struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    // Declared last: removed only after the browser has been dropped
    profile: TempDir,
}

impl ChromeSession {
    async fn launch(config: BrowserConfig, profile: TempDir) -> Result<Self, FetchError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        // CDP messages only flow while the handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler event loop ended");
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            profile,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn read_text(
        &mut self,
        url: &str,
        settings: &FetcherSettings,
    ) -> Result<String, FetchError> {
        let page = tokio::time::timeout(settings.page_load_timeout, self.browser.new_page(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                secs: settings.page_load_timeout.as_secs(),
            })?
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("navigated, settling for {:?}", settings.settle_delay);
        tokio::time::sleep(settings.settle_delay).await;

        let text: String = page
            .evaluate("document.body.innerText")
            .await
            .map_err(|e| FetchError::ReadText(e.to_string()))?
            .into_value()
            .map_err(|e| FetchError::ReadText(e.to_string()))?;

        Ok(text)
    }

    async fn release(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("error closing browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("error waiting for browser exit: {}", e);
        }
        self.handler.abort();
        debug!("browser session released, dropping profile {:?}", self.profile.path());
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Cancelled request: chromiumoxide kills the child when Browser drops
        self.handler.abort();
    }
}

// ============================================================================
// CHROME FETCHER
// ============================================================================

/// Production fetcher: a fresh headless Chromium per call.
#[derive(Debug, Clone, Default)]
pub struct ChromeFetcher {
    settings: FetcherSettings,
}

impl ChromeFetcher {
    pub fn new(settings: FetcherSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self, profile: &Path) -> Result<BrowserConfig, FetchError> {
        let (width, height) = self.settings.window;

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .user_data_dir(profile)
            .request_timeout(self.settings.page_load_timeout)
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.settings.user_agent));

        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(FetchError::Config)
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let profile = new_profile_dir()?;
        let config = self.browser_config(profile.path())?;

        info!("launching headless browser for {}", url);
        let session = ChromeSession::launch(config, profile).await?;
        let text = read_then_release(session, url, &self.settings).await?;

        debug!("page text ({} chars):\n{}", text.len(), text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Session that returns a canned result and counts releases
    struct MockSession {
        outcome: Option<Result<String, FetchError>>,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserSession for MockSession {
        async fn read_text(
            &mut self,
            _url: &str,
            _settings: &FetcherSettings,
        ) -> Result<String, FetchError> {
            self.outcome
                .take()
                .unwrap_or_else(|| Err(FetchError::ReadText("read twice".into())))
        }

        async fn release(self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_released_after_success() {
        let released = Arc::new(AtomicUsize::new(0));
        let session = MockSession {
            outcome: Some(Ok("Folio: A1".to_string())),
            released: released.clone(),
        };

        let text = read_then_release(session, "https://example.test", &FetcherSettings::default())
            .await
            .unwrap();

        assert_eq!(text, "Folio: A1");
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_released_after_timeout() {
        let released = Arc::new(AtomicUsize::new(0));
        let session = MockSession {
            outcome: Some(Err(FetchError::Timeout {
                url: "https://example.test".into(),
                secs: 60,
            })),
            released: released.clone(),
        };

        let err = read_then_release(session, "https://example.test", &FetcherSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { secs: 60, .. }));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fixed_settings() {
        let settings = FetcherSettings::default();
        assert_eq!(settings.settle_delay, Duration::from_secs(15));
        assert_eq!(settings.page_load_timeout, Duration::from_secs(60));
        assert_eq!(settings.window, (1920, 1080));
        assert!(settings.user_agent.contains("Chrome/120.0.0.0"));

        let pinned = settings.with_chrome_executable(Some(PathBuf::from("/opt/chrome")));
        assert_eq!(pinned.chrome_executable, Some(PathBuf::from("/opt/chrome")));
    }

    #[test]
    fn test_each_session_gets_its_own_profile() {
        let first = new_profile_dir().unwrap();
        let second = new_profile_dir().unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir());
        assert!(second.path().is_dir());

        // Removed together with the session
        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!first_path.exists());
        assert!(second.path().is_dir());
    }

    /// Needs a local Chromium: `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_fetch_real_page() {
        let fetcher = ChromeFetcher::new(FetcherSettings {
            settle_delay: Duration::from_millis(200),
            ..FetcherSettings::default()
        });

        let text = fetcher
            .fetch("data:text/html,<body><p>Folio: T-1</p></body>")
            .await
            .unwrap();
        assert!(text.contains("Folio: T-1"));
    }
}
