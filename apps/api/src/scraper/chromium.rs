//! `BrowserSession` backed by a local Chrome/Chromium over CDP.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::scraper::browser::{BrowserError, BrowserLauncher, BrowserSession};
use crate::scraper::strategy::{ElementProbe, ElementSnapshot};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const WINDOW_WIDTH: u32 = 1366;
const WINDOW_HEIGHT: u32 = 768;
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);
const SELECTOR_POLL: Duration = Duration::from_millis(250);

const LAUNCH_ARGS: [&str; 4] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Captures one result element. `__SELECTOR__`, `__INDEX__` and `__PROBE__`
/// are substituted with JSON literals; the script returns a JSON string, or
/// `"null"` when there is no element at that index.
const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const probe = __PROBE__;
  const el = document.querySelectorAll(__SELECTOR__)[__INDEX__];
  if (!el) return 'null';
  const text = (node) => (node ? (node.textContent || '').trim() : '');
  const firstTexts = (selectors) =>
    selectors.map((s) => text(el.querySelector(s))).filter((t) => t.length > 0);
  return JSON.stringify({
    links: Array.from(el.querySelectorAll(probe.linkSelector)).map((a) => a.href || ''),
    nameCandidates: Array.from(el.querySelectorAll(probe.nameSelector)).map(text),
    headlineTexts: firstTexts(probe.headlineSelectors),
    locationTexts: firstTexts(probe.locationSelectors),
    images: Array.from(el.querySelectorAll(probe.imageSelector)).map((img) => ({
      src: img.src || '',
      alt: img.alt || '',
    })),
  });
})()"#;

/// Launches one visible (or headless) browser per scrape.
pub struct ChromiumLauncher {
    headless: bool,
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(headless: bool, executable: Option<PathBuf>) -> Self {
        Self {
            headless,
            executable,
        }
    }

    fn config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .viewport(Viewport {
                width: WINDOW_WIDTH,
                height: WINDOW_HEIGHT,
                ..Default::default()
            })
            .args(LAUNCH_ARGS)
            .launch_timeout(LAUNCH_TIMEOUT);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        info!(headless = self.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(self.config()?)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {e}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::Launch(e.to_string()));
            }
        };
        page.set_user_agent(SetUserAgentOverrideParams::new(USER_AGENT))
            .await
            .map_err(map_cdp)?;

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(browser),
            page,
            handler,
        }))
    }
}

pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(map_cdp)?
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await.map_err(|e| match map_cdp(e) {
            BrowserError::Closed => BrowserError::Closed,
            other => BrowserError::Navigation {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.url().await.map_err(map_cdp)?.unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.page.get_title().await.map_err(map_cdp)?.unwrap_or_default())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let poll = async {
            loop {
                match self.page.find_element(selector).await {
                    Ok(_) => return Ok(()),
                    Err(e) => {
                        if let BrowserError::Closed = map_cdp(e) {
                            return Err(BrowserError::Closed);
                        }
                        tokio::time::sleep(SELECTOR_POLL).await;
                    }
                }
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::SelectorTimeout {
                selector: selector.to_string(),
                timeout,
            })?
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(map_cdp)?;
        Ok(())
    }

    async fn click_if_present(&self, selector: &str) -> Result<bool, BrowserError> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) => {
                return match map_cdp(e) {
                    BrowserError::Closed => Err(BrowserError::Closed),
                    _ => Ok(false),
                }
            }
        };
        element.click().await.map_err(map_cdp)?;
        Ok(true)
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_literal(&selector)?
        ))
        .await
    }

    async fn snapshot(
        &self,
        selector: &str,
        index: usize,
        probe: &ElementProbe,
    ) -> Result<ElementSnapshot, BrowserError> {
        let script = SNAPSHOT_SCRIPT
            .replace("__PROBE__", &js_literal(probe)?)
            .replace("__SELECTOR__", &js_literal(&selector)?)
            .replace("__INDEX__", &index.to_string());
        let raw: String = self.eval(script).await?;
        serde_json::from_str::<Option<ElementSnapshot>>(&raw)
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .ok_or_else(|| BrowserError::Script(format!("no element at index {index}")))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            match map_cdp(e) {
                BrowserError::Closed => debug!("Browser already closed"),
                other => warn!("Browser close failed: {other}"),
            }
        }
        if let Err(e) = browser.wait().await {
            warn!("Waiting for browser exit failed: {e}");
        }
        self.handler.abort();
        Ok(())
    }
}

fn map_cdp(e: CdpError) -> BrowserError {
    let message = e.to_string();
    if message.to_lowercase().contains("closed") {
        BrowserError::Closed
    } else {
        BrowserError::Protocol(message)
    }
}

fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, BrowserError> {
    serde_json::to_string(value).map_err(|e| BrowserError::Script(e.to_string()))
}
