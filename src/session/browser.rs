//! Browser capability boundary.
//!
//! The session driver talks to the page exclusively through this trait so
//! the state machine can be exercised against a scripted stand-in.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::SessionError;

/// Minimal surface the session driver needs from a browser.
///
/// `initialize` owns process startup and is the only operation whose
/// failure the driver treats as fatal; everything else operates on the one
/// page the session holds.
#[async_trait]
pub trait BrowserControl: Send {
    /// Launch the browser and prepare the single session page.
    async fn initialize(&mut self) -> Result<(), SessionError>;

    /// Navigate the page and wait for the main document to load.
    async fn goto(&mut self, url: &str) -> Result<(), SessionError>;

    /// Bounded wait for a selector to appear in the DOM.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Focus the first matching element and type the text into it.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), SessionError>;

    /// Click the first matching element.
    async fn click(&mut self, selector: &str) -> Result<(), SessionError>;

    /// Read one attribute from every element matching the selector, in DOM
    /// order. Elements without the attribute yield `None`.
    async fn attribute_of_all(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<Option<String>>, SessionError>;

    /// Let asynchronous client-side rendering catch up.
    async fn settle(&mut self, delay: Duration);

    /// Release the browser. Idempotent; closing a session that never
    /// initialized is a no-op.
    async fn close(&mut self);
}
