//! Facade over the page rendering/automation engine.
//!
//! The crawler only ever talks to a rendered page through [`PageSession`],
//! and obtains pages through [`BrowserProvider`]/[`BrowserInstance`]. The
//! actual engine is an external collaborator; an adapter for Chrome is
//! available behind the `chrome` feature.

#[cfg(feature = "chrome")]
mod chrome;
mod error;
mod geometry;
mod session;

#[cfg(feature = "chrome")]
pub use chrome::ChromeProvider;
pub use error::PageError;
pub use geometry::{Point, Region, Viewport};
pub use session::{BrowserInstance, BrowserProvider, PageSession};
