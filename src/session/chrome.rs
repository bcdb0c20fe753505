//! chromiumoxide-backed implementation of [`BrowserControl`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::browser::BrowserControl;
use crate::errors::SessionError;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Installed before any navigation so the site cannot read the automation
/// flag.
const MASK_WEBDRIVER_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined,
});
"#;

/// Launch settings for the audited session.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub no_sandbox: bool,
    pub window: (u32, u32),
    pub user_agent: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            no_sandbox: false,
            window: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

struct LiveSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

/// Real browser session. Headful by default because the operator must be
/// able to complete the verification challenge in the window.
pub struct ChromiumBrowser {
    options: BrowserOptions,
    live: Option<LiveSession>,
}

impl ChromiumBrowser {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            live: None,
        }
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.live
            .as_ref()
            .map(|live| &live.page)
            .ok_or(SessionError::NotInitialized)
    }

    fn build_config(&self) -> Result<BrowserConfig, SessionError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.options.window.0, self.options.window.1)
            .launch_timeout(LAUNCH_TIMEOUT)
            .request_timeout(REQUEST_TIMEOUT)
            .args(vec!["--disable-dev-shm-usage", "--no-first-run"]);

        if !self.options.headless {
            builder = builder.with_head();
        }
        if self.options.no_sandbox {
            builder = builder.no_sandbox();
        }

        builder.build().map_err(SessionError::Launch)
    }

    async fn apply_page_overrides(&self) -> Result<(), SessionError> {
        let page = self.page()?;

        let ua = SetUserAgentOverrideParams::builder()
            .user_agent(self.options.user_agent.clone())
            .build()
            .map_err(SessionError::Launch)?;
        page.execute(ua).await.map_err(SessionError::launch)?;

        let mask = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(MASK_WEBDRIVER_SCRIPT)
            .build()
            .map_err(SessionError::Launch)?;
        page.execute(mask).await.map_err(SessionError::launch)?;

        Ok(())
    }
}

#[async_trait]
impl BrowserControl for ChromiumBrowser {
    async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.live.is_some() {
            return Ok(());
        }

        let config = self.build_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(SessionError::launch)?;

        // Drains CDP traffic for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler loop ended");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(SessionError::launch(err));
            }
        };

        self.live = Some(LiveSession {
            browser,
            page,
            handler_task,
        });

        if let Err(err) = self.apply_page_overrides().await {
            self.close().await;
            return Err(err);
        }
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|err| SessionError::navigation(url, err))?;
        // Best effort on top of the load event; callers add their own
        // settle delay for client-side rendering.
        let _ = page.wait_for_navigation().await;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::selector_timeout(selector, timeout));
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|err| SessionError::interaction(selector, err))?;
        element
            .click()
            .await
            .map_err(|err| SessionError::interaction(selector, err))?;
        element
            .type_str(text)
            .await
            .map_err(|err| SessionError::interaction(selector, err))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|err| SessionError::interaction(selector, err))?;
        element
            .click()
            .await
            .map_err(|err| SessionError::interaction(selector, err))?;
        Ok(())
    }

    async fn attribute_of_all(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<Option<String>>, SessionError> {
        let page = self.page()?;
        let expression = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.getAttribute({}))",
            js_literal(selector),
            js_literal(attribute),
        );
        page.evaluate(expression)
            .await
            .map_err(|err| SessionError::evaluation(err))?
            .into_value::<Vec<Option<String>>>()
            .map_err(|err| SessionError::evaluation(err))
    }

    async fn settle(&mut self, delay: Duration) {
        sleep(delay).await;
    }

    async fn close(&mut self) {
        if let Some(mut live) = self.live.take() {
            if let Err(err) = live.browser.close().await {
                warn!(?err, "error while closing browser");
            }
            live.handler_task.abort();
        }
    }
}

/// Quote a string as a JavaScript literal for embedding in an expression.
fn js_literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn js_literal_escapes_embedded_quotes() {
        assert_eq!(
            js_literal(r#"[data-testid="username"]"#),
            r#""[data-testid=\"username\"]""#
        );
    }

    #[test]
    fn default_options_are_headful_sandboxed_desktop() {
        let options = BrowserOptions::default();
        assert!(!options.headless);
        assert!(!options.no_sandbox);
        assert_eq!(options.window, (1920, 1080));
        assert!(options.user_agent.contains("Chrome/120"));
    }

    #[test]
    #[serial]
    fn sandbox_opt_out_comes_only_from_the_options() {
        std::env::set_var("BOARDAUDIT_NO_SANDBOX", "1");
        assert!(!BrowserOptions::default().no_sandbox);
        std::env::remove_var("BOARDAUDIT_NO_SANDBOX");
    }
}
