use crate::CrawlError;

/// Cursor state of one crawl lineage: which shard it belongs to and the
/// rank that will be submitted into the jump-to-rank control next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub lineage: String,
    pub rank: String,
}

impl Cursor {
    pub fn new(lineage: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            lineage: lineage.into(),
            rank: rank.into(),
        }
    }
}

/// Typed form of the wire label grammar `<kind>-<cursorValue>` with
/// `kind` one of `initial`, `next`, `org`. Labels are decoded once when a
/// request is built; handlers never re-parse string fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Seed listing request for a shard.
    Initial(Cursor),
    /// Continuation listing request within a lineage.
    Next(Cursor),
    /// Leaf detail request for one discovered record.
    OrgDetails,
}

impl Label {
    pub fn encode(&self) -> String {
        match self {
            Label::Initial(c) => format!("initial-{}", c.rank),
            Label::Next(c) => format!("next-{}", c.rank),
            Label::OrgDetails => "org-details".to_string(),
        }
    }

    /// Decode a wire label. The grammar carries only the rank, so decoding
    /// is lossy for continuations: the rank doubles as the lineage id. Seed
    /// labels round-trip exactly (their lineage equals the seed rank by
    /// construction); in-process continuations keep their typed cursor and
    /// never pass through here.
    pub fn decode(label: &str) -> Result<Label, CrawlError> {
        match label.split_once('-') {
            Some(("initial", rank)) if !rank.is_empty() => {
                Ok(Label::Initial(Cursor::new(rank, rank)))
            }
            Some(("next", rank)) if !rank.is_empty() => Ok(Label::Next(Cursor::new(rank, rank))),
            Some(("org", "details")) => Ok(Label::OrgDetails),
            _ => Err(CrawlError::InvalidLabel(label.to_string())),
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            Label::Initial(c) | Label::Next(c) => Some(c),
            Label::OrgDetails => None,
        }
    }
}

/// An immutable unit of crawl work. Continuations are new `Request` values,
/// never in-place mutations of the old one.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub label: Label,
    /// Submission idempotency key; equals the encoded label for listing
    /// requests and the target URL for detail requests.
    pub unique_key: String,
    /// Rows this lineage still has to cover; `None` for detail requests.
    pub budget: Option<u64>,
    pub retries: u32,
}

impl Request {
    pub fn seed(url: impl Into<String>, cursor: Cursor, budget: u64) -> Self {
        let label = Label::Initial(cursor);
        Self {
            url: url.into(),
            unique_key: label.encode(),
            label,
            budget: Some(budget),
            retries: 0,
        }
    }

    pub fn continuation(url: impl Into<String>, cursor: Cursor, budget: u64) -> Self {
        let label = Label::Next(cursor);
        Self {
            url: url.into(),
            unique_key: label.encode(),
            label,
            budget: Some(budget),
            retries: 0,
        }
    }

    pub fn detail(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            unique_key: url.clone(),
            url,
            label: Label::OrgDetails,
            budget: None,
            retries: 0,
        }
    }

    pub fn is_listing(&self) -> bool {
        self.label.cursor().is_some()
    }

    pub(crate) fn retried(mut self) -> Self {
        self.retries += 1;
        self
    }
}
