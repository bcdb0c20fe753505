//! Authenticated board session and member extraction.
//!
//! One linear state machine per run: `Uninitialized` through `Closed`,
//! never looping back. Recoverable failures surface as booleans or empty
//! vectors so the orchestration can short-circuit; only engine startup is
//! allowed to escape as an error.

pub mod browser;
pub mod chrome;
pub mod gate;

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{AppConfig, Credentials};
use crate::errors::SessionError;
use crate::records::MemberRecord;

use browser::BrowserControl;
use gate::VerificationGate;

const LOGIN_URL: &str = "https://trello.com/login";

const SELECTOR_USERNAME: &str = r#"[data-testid="username"]"#;
const SELECTOR_LOGIN_SUBMIT: &str = "#login-submit";
const SELECTOR_PASSWORD: &str = "#password";
const SELECTOR_MEMBER_MENU: &str = r#"[data-testid="header-member-menu-button"]"#;
const SELECTOR_BOARD_NAME: &str = r#"[data-testid="board-name-display"]"#;
const SELECTOR_BOARD_HEADER: &str = ".board-header";
const SELECTOR_FACEPILE_MEMBER: &str = r#"[data-testid="board-facepile-member"]"#;
const TITLE_ATTRIBUTE: &str = "title";

const CREDENTIAL_FIELD_TIMEOUT: Duration = Duration::from_secs(30);
const POST_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const BOARD_NAME_TIMEOUT: Duration = Duration::from_secs(10);
const BOARD_HEADER_TIMEOUT: Duration = Duration::from_secs(5);
const CURRENT_USER_TIMEOUT: Duration = Duration::from_secs(5);
const SHORT_SETTLE: Duration = Duration::from_secs(2);
const LONG_SETTLE: Duration = Duration::from_secs(3);

/// Where the session currently stands. Strictly forward-moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    BrowserReady,
    /// Blocked on the operator completing a verification challenge.
    AwaitingVerification,
    LoggedIn,
    OnTargetPage,
    DataExtracted,
    Closed,
}

/// Drives one audited browser session from launch to member extraction.
pub struct SessionDriver<B, G> {
    browser: B,
    gate: G,
    state: SessionState,
}

impl<B: BrowserControl, G: VerificationGate> SessionDriver<B, G> {
    pub fn new(browser: B, gate: G) -> Self {
        Self {
            browser,
            gate,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start the browser. The only driver operation with a fatal error path.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        info!("setting up browser");
        self.browser.initialize().await?;
        self.state = SessionState::BrowserReady;
        Ok(())
    }

    /// Log in with the configured identity. Every lower-level failure is
    /// absorbed into `false`.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> bool {
        info!("logging into Trello");
        match self.try_authenticate(credentials).await {
            Ok(true) => {
                self.state = SessionState::LoggedIn;
                info!("successfully logged in");
                true
            }
            Ok(false) => {
                warn!("login failed: post-login marker never appeared");
                false
            }
            Err(err) => {
                error!(%err, "login error");
                false
            }
        }
    }

    async fn try_authenticate(&mut self, credentials: &Credentials) -> Result<bool, SessionError> {
        self.browser.goto(LOGIN_URL).await?;
        self.browser.settle(SHORT_SETTLE).await;

        self.browser
            .wait_for_selector(SELECTOR_USERNAME, CREDENTIAL_FIELD_TIMEOUT)
            .await?;
        self.browser.fill(SELECTOR_USERNAME, &credentials.email).await?;
        self.browser.click(SELECTOR_LOGIN_SUBMIT).await?;
        self.browser.settle(SHORT_SETTLE).await;

        self.browser
            .wait_for_selector(SELECTOR_PASSWORD, CREDENTIAL_FIELD_TIMEOUT)
            .await?;
        self.browser.fill(SELECTOR_PASSWORD, &credentials.password).await?;
        self.browser.click(SELECTOR_LOGIN_SUBMIT).await?;
        self.browser.settle(LONG_SETTLE).await;

        // The site may now show a challenge only the operator can answer.
        // Block until they confirm, then check for the logged-in marker.
        self.state = SessionState::AwaitingVerification;
        self.gate.wait_for_operator().await?;

        self.wait_optional(SELECTOR_MEMBER_MENU, POST_LOGIN_TIMEOUT).await
    }

    /// Navigate to the board. `false` when the board UI never shows up.
    pub async fn open_board(&mut self, url: &str) -> bool {
        info!(%url, "navigating to board");
        match self.try_open_board(url).await {
            Ok(true) => {
                self.state = SessionState::OnTargetPage;
                info!("board is visible");
                true
            }
            Ok(false) => {
                warn!(
                    "could not access board; check that the URL is correct, that you have \
                     access, and that the board is not private"
                );
                false
            }
            Err(err) => {
                error!(%err, "navigation error");
                false
            }
        }
    }

    async fn try_open_board(&mut self, url: &str) -> Result<bool, SessionError> {
        self.browser.goto(url).await?;
        self.browser.settle(LONG_SETTLE).await;

        if self.wait_optional(SELECTOR_BOARD_NAME, BOARD_NAME_TIMEOUT).await? {
            return Ok(true);
        }
        // Older board chrome exposes a plain header instead.
        self.wait_optional(SELECTOR_BOARD_HEADER, BOARD_HEADER_TIMEOUT).await
    }

    /// Read the facepile. Requires the board page; otherwise returns empty.
    pub async fn extract_members(&mut self, credentials: &Credentials) -> Vec<MemberRecord> {
        if self.state != SessionState::OnTargetPage {
            warn!(state = ?self.state, "member extraction requires the board page");
            return Vec::new();
        }

        info!("scraping member data");
        match self.try_extract_members(credentials).await {
            Ok(members) => {
                self.state = SessionState::DataExtracted;
                info!(count = members.len(), "extraction finished");
                members
            }
            Err(err) => {
                error!(%err, "scraping error");
                Vec::new()
            }
        }
    }

    async fn try_extract_members(
        &mut self,
        credentials: &Credentials,
    ) -> Result<Vec<MemberRecord>, SessionError> {
        self.browser.settle(LONG_SETTLE).await;

        let titles = self
            .browser
            .attribute_of_all(SELECTOR_FACEPILE_MEMBER, TITLE_ATTRIBUTE)
            .await?;
        info!(count = titles.len(), "found facepile member elements");

        let mut members = Vec::new();
        for title in titles {
            let Some(title) = title else {
                warn!("facepile element without a title attribute; skipping");
                continue;
            };
            match MemberRecord::from_facepile_title(&title) {
                Some(record) => {
                    info!(name = %record.name, username = %record.username, "found member");
                    members.push(record);
                }
                None => warn!(%title, "facepile title with no usable name; skipping"),
            }
        }

        if members.is_empty() {
            warn!("no facepile members found; probing for the current user");
            if self.wait_optional(SELECTOR_MEMBER_MENU, CURRENT_USER_TIMEOUT).await? {
                members.push(MemberRecord::current_user(&credentials.email));
            }
        }

        Ok(members)
    }

    /// Release the browser. Safe on every path: before initialize, after a
    /// failure, and when already closed.
    pub async fn close(&mut self) {
        self.browser.close().await;
        // Nothing launched before initialize, so there is nothing to report.
        if !matches!(self.state, SessionState::Uninitialized | SessionState::Closed) {
            info!("browser closed");
        }
        self.state = SessionState::Closed;
    }

    /// The full authenticate, navigate, extract sequence, short-circuiting
    /// to an empty result when a stage reports failure.
    pub async fn scrape(&mut self, config: &AppConfig) -> Vec<MemberRecord> {
        if !self.authenticate(&config.credentials).await {
            return Vec::new();
        }
        if !self.open_board(&config.board_url).await {
            return Vec::new();
        }
        self.extract_members(&config.credentials).await
    }

    /// Bounded wait that reports absence instead of failing.
    async fn wait_optional(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, SessionError> {
        match self.browser.wait_for_selector(selector, timeout).await {
            Ok(()) => Ok(true),
            Err(SessionError::SelectorTimeout { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::gate::AutoContinueGate;
    use super::*;
    use crate::config::InferenceBackend;
    use crate::records::sentinel;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CallLog {
        visited: Vec<String>,
        filled: Vec<(String, String)>,
        clicked: Vec<String>,
        close_calls: usize,
    }

    #[derive(Default)]
    struct ScriptedBrowser {
        present_selectors: HashSet<String>,
        titles: Vec<Option<String>>,
        log: Arc<Mutex<CallLog>>,
    }

    impl ScriptedBrowser {
        fn with_selectors(selectors: &[&str]) -> Self {
            Self {
                present_selectors: selectors.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn log_handle(&self) -> Arc<Mutex<CallLog>> {
            self.log.clone()
        }
    }

    #[async_trait]
    impl BrowserControl for ScriptedBrowser {
        async fn initialize(&mut self) -> Result<(), SessionError> {
            Ok(())
        }

        async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
            self.log.lock().unwrap().visited.push(url.to_string());
            Ok(())
        }

        async fn wait_for_selector(
            &mut self,
            selector: &str,
            timeout: Duration,
        ) -> Result<(), SessionError> {
            if self.present_selectors.contains(selector) {
                Ok(())
            } else {
                Err(SessionError::selector_timeout(selector, timeout))
            }
        }

        async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SessionError> {
            self.log
                .lock()
                .unwrap()
                .filled
                .push((selector.to_string(), text.to_string()));
            Ok(())
        }

        async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
            self.log.lock().unwrap().clicked.push(selector.to_string());
            Ok(())
        }

        async fn attribute_of_all(
            &mut self,
            _selector: &str,
            _attribute: &str,
        ) -> Result<Vec<Option<String>>, SessionError> {
            Ok(self.titles.clone())
        }

        async fn settle(&mut self, _delay: Duration) {}

        async fn close(&mut self) {
            self.log.lock().unwrap().close_calls += 1;
        }
    }

    struct FailingGate;

    #[async_trait]
    impl VerificationGate for FailingGate {
        async fn wait_for_operator(&self) -> Result<(), SessionError> {
            Err(SessionError::OperatorInput("stdin closed".to_string()))
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            credentials: credentials(),
            board_url: "https://trello.com/b/abc/team".to_string(),
            backend: InferenceBackend::HuggingFace {
                api_key: "hf_test".to_string(),
                model: "test-model".to_string(),
            },
            data_dir: "data".into(),
        }
    }

    fn full_page_selectors() -> Vec<&'static str> {
        vec![
            SELECTOR_USERNAME,
            SELECTOR_PASSWORD,
            SELECTOR_MEMBER_MENU,
            SELECTOR_BOARD_NAME,
        ]
    }

    #[tokio::test]
    async fn authenticate_fills_both_credential_fields() {
        let browser = ScriptedBrowser::with_selectors(&full_page_selectors());
        let log = browser.log_handle();
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        driver.initialize().await.expect("initialize");
        assert!(driver.authenticate(&credentials()).await);
        assert_eq!(driver.state(), SessionState::LoggedIn);

        let log = log.lock().unwrap();
        assert_eq!(log.visited, vec![LOGIN_URL.to_string()]);
        assert_eq!(
            log.filled,
            vec![
                (SELECTOR_USERNAME.to_string(), "ops@example.com".to_string()),
                (SELECTOR_PASSWORD.to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(log.clicked.len(), 2);
    }

    #[tokio::test]
    async fn authenticate_reports_false_without_post_login_marker() {
        let browser = ScriptedBrowser::with_selectors(&[SELECTOR_USERNAME, SELECTOR_PASSWORD]);
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        driver.initialize().await.expect("initialize");
        assert!(!driver.authenticate(&credentials()).await);
        assert_ne!(driver.state(), SessionState::LoggedIn);
    }

    #[tokio::test]
    async fn authenticate_reports_false_when_the_operator_gate_fails() {
        // Login would otherwise succeed; only the confirmation fails.
        let browser = ScriptedBrowser::with_selectors(&full_page_selectors());
        let log = browser.log_handle();
        let mut driver = SessionDriver::new(browser, FailingGate);

        driver.initialize().await.expect("initialize");
        assert!(!driver.authenticate(&credentials()).await);
        assert_ne!(driver.state(), SessionState::LoggedIn);
        // Credentials were submitted before the gate broke.
        assert_eq!(log.lock().unwrap().filled.len(), 2);
    }

    #[tokio::test]
    async fn open_board_falls_back_to_the_plain_header() {
        let browser = ScriptedBrowser::with_selectors(&[SELECTOR_BOARD_HEADER]);
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        assert!(driver.open_board("https://trello.com/b/abc/team").await);
        assert_eq!(driver.state(), SessionState::OnTargetPage);
    }

    #[tokio::test]
    async fn open_board_fails_without_any_board_marker() {
        let browser = ScriptedBrowser::with_selectors(&[]);
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        assert!(!driver.open_board("https://trello.com/b/abc/team").await);
        assert_ne!(driver.state(), SessionState::OnTargetPage);
    }

    #[tokio::test]
    async fn extraction_parses_titles_and_skips_unusable_ones() {
        let mut browser = ScriptedBrowser::with_selectors(&full_page_selectors());
        browser.titles = vec![
            Some("Jane Doe (jdoe)".to_string()),
            None,
            Some("   ".to_string()),
            Some("John Roe".to_string()),
        ];
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        let members = driver.scrape(&test_config()).await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Jane Doe");
        assert_eq!(members[0].username, "jdoe");
        assert_eq!(members[1].name, "John Roe");
        assert_eq!(members[1].username, sentinel::UNKNOWN);
        assert_eq!(driver.state(), SessionState::DataExtracted);
    }

    #[tokio::test]
    async fn empty_facepile_synthesizes_the_current_user() {
        let browser = ScriptedBrowser::with_selectors(&full_page_selectors());
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        let members = driver.scrape(&test_config()).await;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, sentinel::CURRENT_USER_NAME);
        assert_eq!(members[0].email, "ops@example.com");
        assert_eq!(members[0].role, sentinel::ADMIN_ROLE);
    }

    #[tokio::test]
    async fn extraction_requires_the_board_page() {
        let mut browser = ScriptedBrowser::with_selectors(&[]);
        browser.titles = vec![Some("Jane Doe (jdoe)".to_string())];
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        let members = driver.extract_members(&credentials()).await;
        assert!(members.is_empty());
        assert_eq!(driver.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn scrape_short_circuits_on_login_failure() {
        let browser = ScriptedBrowser::with_selectors(&[]);
        let log = browser.log_handle();
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        let members = driver.scrape(&test_config()).await;
        assert!(members.is_empty());
        // Never navigated past the login page.
        assert_eq!(log.lock().unwrap().visited, vec![LOGIN_URL.to_string()]);
    }

    #[tokio::test]
    async fn close_is_safe_twice_and_without_initialize() {
        let browser = ScriptedBrowser::default();
        let log = browser.log_handle();
        let mut driver = SessionDriver::new(browser, AutoContinueGate);

        driver.close().await;
        driver.close().await;
        assert_eq!(driver.state(), SessionState::Closed);
        assert_eq!(log.lock().unwrap().close_calls, 2);
    }
}
