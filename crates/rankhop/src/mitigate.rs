use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rankhop_crawler::CrawlError;
use rankhop_page::{PageSession, Point, Region, Viewport};
use serde::Serialize;

/// Where the anti-bot challenge renders relative to the blocked interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeKind {
    /// Whole-page interstitial; the press target sits below center.
    Fullscreen,
    /// Modal over the listing; the press target sits above center.
    Overlay,
}

/// One page interaction the crawl depends on.
#[derive(Debug, Clone, Copy)]
pub enum Interaction<'a> {
    Fill { selector: &'a str, value: &'a str },
    Click { selector: &'a str },
    WaitVisible { selector: &'a str },
}

impl Interaction<'_> {
    pub fn selector(&self) -> &str {
        match self {
            Interaction::Fill { selector, .. }
            | Interaction::Click { selector }
            | Interaction::WaitVisible { selector } => selector,
        }
    }

    /// Waiting for page content to render fails under a full-page
    /// interstitial; input interactions fail under a modal overlay.
    pub fn challenge_kind(&self) -> ChallengeKind {
        match self {
            Interaction::WaitVisible { .. } => ChallengeKind::Fullscreen,
            Interaction::Fill { .. } | Interaction::Click { .. } => ChallengeKind::Overlay,
        }
    }
}

/// Record of one mitigation attempt, kept for offline analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeEvent {
    pub at: DateTime<Utc>,
    pub kind: ChallengeKind,
    pub selector: String,
    pub screen_size: Viewport,
    pub click_location: Point,
    pub hold_duration_secs: f64,
    /// Screenshot sample name, when capture succeeded.
    pub sample_id: Option<String>,
}

/// Press target for a challenge: viewport center nudged 5% of the height,
/// down for interstitials and up for overlays.
fn challenge_point(kind: ChallengeKind, viewport: Viewport) -> Point {
    let center = viewport.center();
    let nudge = f64::from(viewport.height) * 0.05;
    let y = match kind {
        ChallengeKind::Fullscreen => center.y + nudge,
        ChallengeKind::Overlay => center.y - nudge,
    };
    Point { x: center.x, y }
}

/// Wraps page interactions in the two-attempt challenge protocol: a short
/// first wait, then on an actionability failure one press-and-hold
/// mitigation followed by a single longer fallback wait. Never more than
/// two attempts per interaction. A challenge that survives both attempts
/// escalates to a governor-level failure: [`CrawlError::Blocked`] for
/// interstitials, [`CrawlError::RateLimited`] for overlays.
pub struct Mitigator {
    run_id: String,
    wait_short: Duration,
    wait_long: Duration,
    shot_dir: Option<PathBuf>,
    seq: AtomicU64,
    events: Mutex<Vec<ChallengeEvent>>,
}

impl Mitigator {
    pub fn new(run_id: impl Into<String>, wait_short: Duration, wait_long: Duration) -> Self {
        Self {
            run_id: run_id.into(),
            wait_short,
            wait_long,
            shot_dir: None,
            seq: AtomicU64::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Save a PNG of the press region under `dir` for every mitigation.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shot_dir = Some(dir.into());
        self
    }

    /// Run `interaction`, mitigating an apparent challenge at most once.
    pub async fn guarded_interact(
        &self,
        page: &mut dyn PageSession,
        interaction: Interaction<'_>,
    ) -> Result<(), CrawlError> {
        match self.attempt(page, interaction, self.wait_short).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_actionability() => {
                log::warn!(
                    "run {}: {}",
                    self.run_id,
                    CrawlError::InteractionTimeout {
                        selector: interaction.selector().to_string(),
                        timeout: self.wait_short,
                    }
                );
                self.mitigate(page, interaction).await;
            }
            Err(e) => return Err(e.into()),
        }

        match self.attempt(page, interaction, self.wait_long).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_actionability() => {
                let selector = interaction.selector().to_string();
                Err(match interaction.challenge_kind() {
                    ChallengeKind::Fullscreen => CrawlError::Blocked { selector },
                    ChallengeKind::Overlay => CrawlError::RateLimited { selector },
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mitigation events recorded so far.
    pub fn events(&self) -> Vec<ChallengeEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn attempt(
        &self,
        page: &mut dyn PageSession,
        interaction: Interaction<'_>,
        timeout: Duration,
    ) -> Result<(), rankhop_page::PageError> {
        page.wait_for(interaction.selector(), timeout).await?;
        match interaction {
            Interaction::Fill { selector, value } => page.fill(selector, value).await,
            Interaction::Click { selector } => page.click(selector).await,
            Interaction::WaitVisible { .. } => Ok(()),
        }
    }

    /// Human-shaped press-and-hold at the presumed challenge location. Only
    /// the hold itself matters for recovery; capture and bookkeeping
    /// failures are logged and swallowed.
    async fn mitigate(&self, page: &mut dyn PageSession, interaction: Interaction<'_>) {
        let kind = interaction.challenge_kind();
        let viewport = page.viewport();
        let at = challenge_point(kind, viewport);
        let hold_secs = rand::thread_rng().gen_range(5.0..=15.0);
        let hold = Duration::from_secs_f64(hold_secs);

        log::info!(
            "run {}: mitigating {kind:?} challenge on `{}`, holding {hold_secs:.1}s at ({:.0},{:.0})",
            self.run_id,
            interaction.selector(),
            at.x,
            at.y
        );
        if let Err(e) = page.press_and_hold(at, hold).await {
            log::warn!("press-and-hold failed: {e}");
        }

        let sample_id = self.capture(page, at, viewport).await;
        let event = ChallengeEvent {
            at: Utc::now(),
            kind,
            selector: interaction.selector().to_string(),
            screen_size: viewport,
            click_location: at,
            hold_duration_secs: hold_secs,
            sample_id,
        };
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    async fn capture(
        &self,
        page: &mut dyn PageSession,
        at: Point,
        viewport: Viewport,
    ) -> Option<String> {
        let dir = self.shot_dir.as_ref()?;
        let region = Region::around(at, 480.0, 320.0, viewport);
        let png = match page.screenshot(region).await {
            Ok(png) => png,
            Err(e) => {
                log::warn!("challenge screenshot failed: {e}");
                return None;
            }
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let sample_id = format!("{}-{seq:04}", self.run_id);
        if let Err(e) = std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(dir.join(format!("{sample_id}.png")), png))
        {
            log::warn!("challenge screenshot not saved: {e}");
            return None;
        }
        Some(sample_id)
    }
}
