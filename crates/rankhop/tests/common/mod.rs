//! In-memory page engine backing the crawl scenarios: a ranked catalog
//! served through the same selector surface the real listing exposes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rankhop::extract::sel;
use rankhop_page::{
    BrowserInstance, BrowserProvider, PageError, PageSession, Point, Region, Viewport,
};

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub rank: u64,
    pub name: String,
    pub link: Option<String>,
    pub industries: Vec<String>,
    pub location: Vec<String>,
    pub description: String,
}

impl FakeRow {
    pub fn new(rank: u64, link: bool) -> Self {
        Self {
            rank,
            name: format!("Org {rank}"),
            link: link.then(|| format!("/organization/org-{rank}")),
            industries: vec!["Software".to_string()],
            location: vec!["Berlin".to_string(), "Germany".to_string()],
            description: format!("Organization ranked {rank}"),
        }
    }
}

/// Ranks render with grouping separators, as the remote does.
pub fn fmt_rank(rank: u64) -> String {
    let digits = rank.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Default)]
pub struct Catalog {
    pub rows: Vec<FakeRow>,
    pub page_size: usize,
    /// Ranks at or past this value stop advancing: the served window always
    /// ends at the requested rank.
    pub freeze_at: Option<u64>,
    /// Waits fail until a press-and-hold clears the challenge.
    pub challenge_pending: bool,
    /// The challenge never clears; both attempts fail.
    pub challenge_permanent: bool,
    pub about: Vec<(String, Vec<String>)>,
    pub people: Vec<String>,
    pub full_text: String,
    // observations
    pub wait_attempts: Vec<String>,
    pub holds: Vec<(Point, Duration)>,
    pub shots: Vec<Region>,
    pub visited: Vec<String>,
}

impl Catalog {
    pub fn ranked(n: u64, page_size: usize, link_every: u64) -> Self {
        Self {
            rows: (1..=n)
                .map(|rank| FakeRow::new(rank, link_every > 0 && rank % link_every == 0))
                .collect(),
            page_size,
            about: vec![
                ("Founded 2010".to_string(), vec![]),
                (
                    "Website".to_string(),
                    vec!["https://org.test".to_string()],
                ),
            ],
            people: vec!["Ada".to_string(), "Grace".to_string()],
            full_text: "profile page".to_string(),
            ..Default::default()
        }
    }

    fn window(&self, requested: u64) -> Vec<FakeRow> {
        if let Some(freeze) = self.freeze_at {
            if requested >= freeze {
                let upto: Vec<FakeRow> = self
                    .rows
                    .iter()
                    .filter(|r| r.rank <= requested)
                    .cloned()
                    .collect();
                let start = upto.len().saturating_sub(self.page_size);
                return upto[start..].to_vec();
            }
        }
        self.rows
            .iter()
            .filter(|r| r.rank > requested)
            .take(self.page_size)
            .cloned()
            .collect()
    }
}

enum Mode {
    Listing,
    Detail,
}

pub struct FakePage {
    catalog: Arc<Mutex<Catalog>>,
    mode: Mode,
    pending: Option<String>,
    window: Vec<FakeRow>,
}

impl FakePage {
    pub fn new(catalog: Arc<Mutex<Catalog>>) -> Self {
        Self {
            catalog,
            mode: Mode::Listing,
            pending: None,
            window: Vec::new(),
        }
    }

    fn row(&self, index: usize) -> Result<&FakeRow, PageError> {
        self.window.get(index).ok_or(PageError::MissingElement {
            selector: sel::ROW_MARKER.to_string(),
            index,
        })
    }

    fn missing(selector: &str, index: usize) -> PageError {
        PageError::MissingElement {
            selector: selector.to_string(),
            index,
        }
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&mut self, url: &str) -> Result<(), PageError> {
        let mut cat = self.catalog.lock().unwrap();
        cat.visited.push(url.to_string());
        self.mode = if url.contains("/organization/") {
            Mode::Detail
        } else {
            Mode::Listing
        };
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), PageError> {
        if selector != sel::JUMP_INPUT {
            return Err(Self::missing(selector, 0));
        }
        self.pending = Some(value.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), PageError> {
        if selector != sel::SEARCH_BUTTON {
            return Err(Self::missing(selector, 0));
        }
        let requested: u64 = self
            .pending
            .take()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| PageError::Engine("no jump value".to_string()))?;
        self.window = self.catalog.lock().unwrap().window(requested);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let mut cat = self.catalog.lock().unwrap();
        cat.wait_attempts.push(selector.to_string());
        if cat.challenge_pending {
            return Err(PageError::WaitTimeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        let known = match self.mode {
            Mode::Listing => [sel::JUMP_INPUT, sel::SEARCH_BUTTON, sel::ROW_MARKER]
                .contains(&selector),
            Mode::Detail => selector == sel::PROFILE_MARKER,
        };
        if known {
            Ok(())
        } else {
            Err(PageError::WaitTimeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, PageError> {
        match self.mode {
            Mode::Detail if selector == sel::ABOUT_CARD => {
                Ok(self.catalog.lock().unwrap().about.len())
            }
            _ => Ok(0),
        }
    }

    async fn inner_text(&self, selector: &str, index: usize) -> Result<String, PageError> {
        match self.mode {
            Mode::Listing if selector == sel::ORG_NAME => Ok(self.row(index)?.name.clone()),
            Mode::Detail if selector == sel::ABOUT_CARD => {
                let cat = self.catalog.lock().unwrap();
                cat.about
                    .get(index)
                    .map(|(text, _)| text.clone())
                    .ok_or_else(|| Self::missing(selector, index))
            }
            _ => Err(Self::missing(selector, index)),
        }
    }

    async fn scoped_text(
        &self,
        selector: &str,
        index: usize,
        _scope: &str,
    ) -> Result<String, PageError> {
        let row = self.row(index)?;
        match selector {
            s if s == sel::RANK_CELL => Ok(fmt_rank(row.rank)),
            s if s == sel::DESCRIPTION_CELL => Ok(row.description.clone()),
            _ => Err(Self::missing(selector, index)),
        }
    }

    async fn scoped_texts(
        &self,
        selector: &str,
        index: usize,
        _scope: &str,
    ) -> Result<Vec<String>, PageError> {
        let row = self.row(index)?;
        match selector {
            s if s == sel::CATEGORY_CELL => Ok(row.industries.clone()),
            s if s == sel::LOCATION_CELL => Ok(row.location.clone()),
            _ => Err(Self::missing(selector, index)),
        }
    }

    async fn scoped_attr(
        &self,
        selector: &str,
        index: usize,
        _scope: &str,
        _attr: &str,
    ) -> Result<Option<String>, PageError> {
        if selector != sel::LINK_CELL {
            return Err(Self::missing(selector, index));
        }
        Ok(self.row(index)?.link.clone())
    }

    async fn scoped_attrs(
        &self,
        selector: &str,
        index: usize,
        _scope: &str,
        _attr: &str,
    ) -> Result<Vec<String>, PageError> {
        match self.mode {
            Mode::Detail if selector == sel::ABOUT_CARD => {
                let cat = self.catalog.lock().unwrap();
                cat.about
                    .get(index)
                    .map(|(_, links)| links.clone())
                    .ok_or_else(|| Self::missing(selector, index))
            }
            _ => Err(Self::missing(selector, index)),
        }
    }

    async fn all_texts(&self, selector: &str) -> Result<Vec<String>, PageError> {
        match self.mode {
            Mode::Detail if selector == sel::PEOPLE => {
                Ok(self.catalog.lock().unwrap().people.clone())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn full_text(&self) -> Result<String, PageError> {
        Ok(self.catalog.lock().unwrap().full_text.clone())
    }

    fn viewport(&self) -> Viewport {
        Viewport::default()
    }

    async fn press_and_hold(&mut self, at: Point, duration: Duration) -> Result<(), PageError> {
        let mut cat = self.catalog.lock().unwrap();
        cat.holds.push((at, duration));
        if cat.challenge_pending && !cat.challenge_permanent {
            cat.challenge_pending = false;
        }
        Ok(())
    }

    async fn screenshot(&mut self, region: Region) -> Result<Vec<u8>, PageError> {
        self.catalog.lock().unwrap().shots.push(region);
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

pub struct FakeBrowser {
    catalog: Arc<Mutex<Catalog>>,
}

#[async_trait]
impl BrowserInstance for FakeBrowser {
    async fn new_page(&mut self) -> Result<Box<dyn PageSession>, PageError> {
        Ok(Box::new(FakePage::new(self.catalog.clone())))
    }
}

pub struct FakeProvider {
    catalog: Arc<Mutex<Catalog>>,
    launches: AtomicUsize,
}

impl FakeProvider {
    pub fn new(catalog: Arc<Mutex<Catalog>>) -> Self {
        Self {
            catalog,
            launches: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserProvider for FakeProvider {
    async fn launch(&self, _identity: &str) -> Result<Box<dyn BrowserInstance>, PageError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            catalog: self.catalog.clone(),
        }))
    }
}
