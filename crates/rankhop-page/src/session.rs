use std::time::Duration;

use async_trait::async_trait;

use crate::{PageError, Point, Region, Viewport};

/// One rendered page. Everything the crawler does to a page goes through
/// this trait; element addressing follows the engine's CSS selector + index
/// model (`nth` match of a selector, optionally scoped by a child selector).
/// Handlers borrow pages across await points inside `Send` futures, so
/// implementors must be shareable.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&mut self, url: &str) -> Result<(), PageError>;

    /// Set the value of the first element matching `selector`.
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), PageError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), PageError>;

    /// Wait until at least one element matching `selector` is renderable.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    async fn count(&self, selector: &str) -> Result<usize, PageError>;

    /// Inner text of the `index`-th match of `selector`.
    async fn inner_text(&self, selector: &str, index: usize) -> Result<String, PageError>;

    /// Inner text of the first `scope` element under the `index`-th match.
    async fn scoped_text(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
    ) -> Result<String, PageError>;

    /// Inner texts of all `scope` elements under the `index`-th match.
    async fn scoped_texts(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
    ) -> Result<Vec<String>, PageError>;

    /// Attribute of the first `scope` element under the `index`-th match.
    async fn scoped_attr(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
        attr: &str,
    ) -> Result<Option<String>, PageError>;

    /// Attribute values of all `scope` elements under the `index`-th match.
    async fn scoped_attrs(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
        attr: &str,
    ) -> Result<Vec<String>, PageError>;

    /// Inner texts of every match of `selector`.
    async fn all_texts(&self, selector: &str) -> Result<Vec<String>, PageError>;

    /// Visible text of the whole page.
    async fn full_text(&self) -> Result<String, PageError>;

    fn viewport(&self) -> Viewport;

    /// Simulated press-and-hold at a page coordinate.
    async fn press_and_hold(&mut self, at: Point, duration: Duration) -> Result<(), PageError>;

    /// PNG capture of a bounded page region.
    async fn screenshot(&mut self, region: Region) -> Result<Vec<u8>, PageError>;
}

/// One running browser instance (fingerprint-level identity).
#[async_trait]
pub trait BrowserInstance: Send {
    async fn new_page(&mut self) -> Result<Box<dyn PageSession>, PageError>;
}

/// Launches browser instances. Each launch is a fresh identity; the resource
/// governor decides when an instance is retired.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn launch(&self, identity: &str) -> Result<Box<dyn BrowserInstance>, PageError>;
}
