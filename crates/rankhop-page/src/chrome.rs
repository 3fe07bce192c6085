//! Chrome adapter for the page facade, built on `headless_chrome`.
//!
//! Element queries go through `evaluate` with selector literals embedded as
//! JSON strings, which keeps the adapter independent of the engine's typed
//! element handles.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::{BrowserInstance, BrowserProvider, PageError, PageSession, Point, Region, Viewport};

pub struct ChromeProvider {
    headless: bool,
    viewport: Viewport,
}

impl ChromeProvider {
    pub fn new(headless: bool, viewport: Viewport) -> Self {
        Self { headless, viewport }
    }
}

#[async_trait]
impl BrowserProvider for ChromeProvider {
    async fn launch(&self, identity: &str) -> Result<Box<dyn BrowserInstance>, PageError> {
        log::debug!("launching browser instance {identity}");
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--incognito"),
        ];
        let browser = Browser::new(LaunchOptions {
            headless: self.headless,
            window_size: Some((self.viewport.width, self.viewport.height)),
            args,
            ..Default::default()
        })
        .map_err(engine_err)?;
        Ok(Box::new(ChromeBrowser {
            browser,
            viewport: self.viewport,
        }))
    }
}

pub struct ChromeBrowser {
    browser: Browser,
    viewport: Viewport,
}

#[async_trait]
impl BrowserInstance for ChromeBrowser {
    async fn new_page(&mut self) -> Result<Box<dyn PageSession>, PageError> {
        let tab = self.browser.new_tab().map_err(engine_err)?;
        Ok(Box::new(ChromePage {
            tab,
            viewport: self.viewport,
        }))
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl ChromePage {
    fn eval(&self, expr: &str) -> Result<serde_json::Value, PageError> {
        let obj = self.tab.evaluate(expr, false).map_err(engine_err)?;
        Ok(obj.value.unwrap_or(serde_json::Value::Null))
    }
}

fn engine_err(e: anyhow::Error) -> PageError {
    PageError::Engine(e.to_string())
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

#[async_trait]
impl PageSession for ChromePage {
    async fn goto(&mut self, url: &str) -> Result<(), PageError> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), PageError> {
        let expr = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                el.value = {val};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector),
            val = js_str(value),
        );
        match self.eval(&expr)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index: 0,
            }),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), PageError> {
        let expr = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            sel = js_str(selector),
        );
        match self.eval(&expr)? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index: 0,
            }),
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|_| PageError::WaitTimeout {
                selector: selector.to_string(),
                timeout,
            })
    }

    async fn count(&self, selector: &str) -> Result<usize, PageError> {
        let expr = format!(
            "document.querySelectorAll({sel}).length",
            sel = js_str(selector)
        );
        Ok(self.eval(&expr)?.as_u64().unwrap_or(0) as usize)
    }

    async fn inner_text(&self, selector: &str, index: usize) -> Result<String, PageError> {
        let expr = format!(
            r#"(() => {{
                const el = document.querySelectorAll({sel})[{index}];
                return el ? el.innerText : null;
            }})()"#,
            sel = js_str(selector),
        );
        match self.eval(&expr)? {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index,
            }),
        }
    }

    async fn scoped_text(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
    ) -> Result<String, PageError> {
        let expr = format!(
            r#"(() => {{
                const row = document.querySelectorAll({sel})[{index}];
                if (!row) return null;
                const el = row.querySelector({scope});
                return el ? el.innerText : null;
            }})()"#,
            sel = js_str(selector),
            scope = js_str(scope),
        );
        match self.eval(&expr)? {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index,
            }),
        }
    }

    async fn scoped_texts(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
    ) -> Result<Vec<String>, PageError> {
        let expr = format!(
            r#"(() => {{
                const row = document.querySelectorAll({sel})[{index}];
                if (!row) return null;
                return Array.from(row.querySelectorAll({scope})).map(el => el.innerText);
            }})()"#,
            sel = js_str(selector),
            scope = js_str(scope),
        );
        match self.eval(&expr)? {
            v @ serde_json::Value::Array(_) => {
                Ok(serde_json::from_value(v).map_err(|e| PageError::Engine(e.to_string()))?)
            }
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index,
            }),
        }
    }

    async fn scoped_attr(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
        attr: &str,
    ) -> Result<Option<String>, PageError> {
        let expr = format!(
            r#"(() => {{
                const row = document.querySelectorAll({sel})[{index}];
                if (!row) return "__missing__";
                const el = row.querySelector({scope});
                if (!el) return "__missing__";
                return el.getAttribute({attr});
            }})()"#,
            sel = js_str(selector),
            scope = js_str(scope),
            attr = js_str(attr),
        );
        match self.eval(&expr)? {
            serde_json::Value::String(s) if s == "__missing__" => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index,
            }),
            serde_json::Value::String(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    async fn scoped_attrs(
        &self,
        selector: &str,
        index: usize,
        scope: &str,
        attr: &str,
    ) -> Result<Vec<String>, PageError> {
        let expr = format!(
            r#"(() => {{
                const row = document.querySelectorAll({sel})[{index}];
                if (!row) return null;
                return Array.from(row.querySelectorAll({scope}))
                    .map(el => el.getAttribute({attr}))
                    .filter(v => v !== null);
            }})()"#,
            sel = js_str(selector),
            scope = js_str(scope),
            attr = js_str(attr),
        );
        match self.eval(&expr)? {
            v @ serde_json::Value::Array(_) => {
                Ok(serde_json::from_value(v).map_err(|e| PageError::Engine(e.to_string()))?)
            }
            _ => Err(PageError::MissingElement {
                selector: selector.to_string(),
                index,
            }),
        }
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>, PageError> {
        let expr = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => el.innerText)",
            sel = js_str(selector),
        );
        match self.eval(&expr)? {
            v @ serde_json::Value::Array(_) => {
                Ok(serde_json::from_value(v).map_err(|e| PageError::Engine(e.to_string()))?)
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn full_text(&self) -> Result<String, PageError> {
        match self.eval("document.body ? document.body.innerText : ''")? {
            serde_json::Value::String(s) => Ok(s),
            _ => Ok(String::new()),
        }
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn press_and_hold(&mut self, at: Point, duration: Duration) -> Result<(), PageError> {
        let down = format!(
            r#"(() => {{
                const el = document.elementFromPoint({x}, {y}) || document.body;
                const opts = {{ bubbles: true, clientX: {x}, clientY: {y}, buttons: 1 }};
                el.dispatchEvent(new PointerEvent('pointerdown', opts));
                el.dispatchEvent(new MouseEvent('mousedown', opts));
                return true;
            }})()"#,
            x = at.x,
            y = at.y,
        );
        let up = format!(
            r#"(() => {{
                const el = document.elementFromPoint({x}, {y}) || document.body;
                const opts = {{ bubbles: true, clientX: {x}, clientY: {y} }};
                el.dispatchEvent(new PointerEvent('pointerup', opts));
                el.dispatchEvent(new MouseEvent('mouseup', opts));
                el.dispatchEvent(new MouseEvent('click', opts));
                return true;
            }})()"#,
            x = at.x,
            y = at.y,
        );
        self.eval(&down)?;
        tokio::time::sleep(duration).await;
        self.eval(&up)?;
        Ok(())
    }

    async fn screenshot(&mut self, region: Region) -> Result<Vec<u8>, PageError> {
        self.tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(Page::Viewport {
                    x: region.x,
                    y: region.y,
                    width: region.width,
                    height: region.height,
                    scale: 1.0,
                }),
                true,
            )
            .map_err(engine_err)
    }
}
