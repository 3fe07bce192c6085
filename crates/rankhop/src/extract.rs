use rankhop_crawler::CrawlError;
use rankhop_page::{PageError, PageSession};
use serde::{Deserialize, Serialize};

/// Selectors for the remote's rendered regions.
pub mod sel {
    /// Jump-to-rank input.
    pub const JUMP_INPUT: &str = ".mat-mdc-input-element";
    /// Button that re-renders the page from the jump input.
    pub const SEARCH_BUTTON: &str = "search-button .mdc-button";
    /// Renderable marker that a page of rows has appeared.
    pub const ROW_MARKER: &str = ".identifier-label";

    pub const ORG_NAME: &str = ".identifier-label";
    pub const LINK_CELL: &str = "grid-cell.column-id-identifier";
    pub const CATEGORY_CELL: &str = "grid-cell.column-id-categories";
    pub const LOCATION_CELL: &str = "grid-cell.column-id-location_identifiers";
    pub const DESCRIPTION_CELL: &str = "grid-cell.column-id-short_description";
    pub const RANK_CELL: &str = "grid-cell.column-id-rank_org_company";
    /// Multi-value formatter entries inside category/location cells.
    pub const MULTI_VALUE: &str = "identifier-multi-formatter .ng-star-inserted";

    /// Renderable marker that a profile page has appeared.
    pub const PROFILE_MARKER: &str = "profile-section";
    pub const ABOUT_CARD: &str = "profile-section .description-card";
    pub const PEOPLE: &str = "people-card .identifier-label";
}

/// One listing row. Field names match the records the sink has always
/// stored, so exports stay column-compatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub organization_name: String,
    pub organization_link: Option<String>,
    pub industries: Vec<String>,
    #[serde(rename = "headquarterLocation")]
    pub headquarter_location: Vec<String>,
    pub description: String,
    /// The remote's ordering key; the only valid source of the next cursor
    /// value.
    #[serde(rename = "cbRank")]
    pub cb_rank: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutField {
    pub text: String,
    pub links: Vec<String>,
}

/// One organization detail page, correlated to its listing row by URL only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgDetails {
    pub url: String,
    pub about_fields: Vec<AboutField>,
    pub people: Vec<String>,
    pub full_page_text: String,
}

/// Read one row off the rendered page. Missing secondary regions degrade to
/// empty values; a missing or blank rank region fails the row with
/// [`CrawlError::ExtractionGap`] so the cursor never advances to a blank
/// target.
pub async fn extract_row(page: &dyn PageSession, index: usize) -> Result<Row, CrawlError> {
    let cb_rank = match page.scoped_text(sel::RANK_CELL, index, "a").await {
        Ok(rank) if !rank.trim().is_empty() => rank.trim().to_string(),
        Ok(_) => return Err(CrawlError::ExtractionGap { index }),
        Err(PageError::MissingElement { .. }) => return Err(CrawlError::ExtractionGap { index }),
        Err(e) => return Err(e.into()),
    };

    let organization_name = optional(page.inner_text(sel::ORG_NAME, index).await)?;
    let organization_link = match page.scoped_attr(sel::LINK_CELL, index, "a", "href").await {
        Ok(link) => link.filter(|l| !l.is_empty()),
        Err(PageError::MissingElement { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let industries = optional(
        page.scoped_texts(sel::CATEGORY_CELL, index, sel::MULTI_VALUE)
            .await,
    )?;
    let headquarter_location = optional(
        page.scoped_texts(sel::LOCATION_CELL, index, sel::MULTI_VALUE)
            .await,
    )?;
    let description = optional(page.scoped_text(sel::DESCRIPTION_CELL, index, "span").await)?;

    Ok(Row {
        organization_name,
        organization_link,
        industries,
        headquarter_location,
        description,
        cb_rank,
    })
}

/// Read an organization detail page.
pub async fn extract_details(page: &dyn PageSession, url: &str) -> Result<OrgDetails, CrawlError> {
    let cards = match page.count(sel::ABOUT_CARD).await {
        Ok(n) => n,
        Err(PageError::MissingElement { .. }) => 0,
        Err(e) => return Err(e.into()),
    };
    let mut about_fields = Vec::with_capacity(cards);
    for index in 0..cards {
        let text = optional(page.inner_text(sel::ABOUT_CARD, index).await)?;
        let links = optional(page.scoped_attrs(sel::ABOUT_CARD, index, "a", "href").await)?;
        about_fields.push(AboutField { text, links });
    }

    let people = optional(page.all_texts(sel::PEOPLE).await)?;
    let full_page_text = page.full_text().await?;

    Ok(OrgDetails {
        url: url.to_string(),
        about_fields,
        people,
        full_page_text,
    })
}

/// Degrade a missing region to its empty value; anything else propagates.
fn optional<T: Default>(res: Result<T, PageError>) -> Result<T, CrawlError> {
    match res {
        Ok(v) => Ok(v),
        Err(PageError::MissingElement { .. }) => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}
