//! Shared types used across jobharvest.
//!
//! The central type is [`Job`], the platform-agnostic record every adapter
//! produces. A `Job` can only be created through its per-platform factories
//! ([`Job::linkedin`], [`Job::seek`], [`Job::indeed`]), which trim and
//! default every field and reject records missing the title, company or
//! job URL.

use crate::error::HarvestError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for run identifiers.
///
/// Every scraping run gets a fresh UUID v4 that shows up in log spans and
/// result messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a `RunId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID v4.
    pub fn new(id: impl Into<String>) -> Result<Self, HarvestError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a new random `RunId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), HarvestError> {
        static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = UUID_REGEX.get_or_init(|| {
            Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
                .expect("valid regex")
        });

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(HarvestError::Validation(format!(
                "invalid run ID: must be a valid UUID v4, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job boards with a dedicated adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Professional network
    #[serde(rename = "LinkedIn")]
    LinkedIn,
    /// Regional board
    #[serde(rename = "SEEK")]
    Seek,
    /// Generalist board
    #[serde(rename = "Indeed")]
    Indeed,
}

impl Platform {
    /// All supported platforms, in classifier order.
    pub const ALL: [Platform; 3] = [Platform::LinkedIn, Platform::Seek, Platform::Indeed];

    /// Display name, identical to the serialized form.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::Seek => "SEEK",
            Self::Indeed => "Indeed",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Workplace arrangement advertised by a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkplaceType {
    /// Fully remote
    #[serde(rename = "Remote")]
    Remote,
    /// Mix of remote and office
    #[serde(rename = "Hybrid")]
    Hybrid,
    /// Office based
    #[serde(rename = "On-site")]
    OnSite,
    /// Not stated
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl WorkplaceType {
    /// Label used in serialized records; empty when unspecified.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Remote => "Remote",
            Self::Hybrid => "Hybrid",
            Self::OnSite => "On-site",
            Self::Unspecified => "",
        }
    }

    /// Infer the arrangement from free text such as a location line or a
    /// badge. Hybrid wins over remote because boards write "Hybrid remote".
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("hybrid") {
            Self::Hybrid
        } else if lower.contains("remote") || lower.contains("work from home") {
            Self::Remote
        } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("on site")
        {
            Self::OnSite
        } else {
            Self::Unspecified
        }
    }

    /// Whether a value is present.
    #[must_use]
    pub fn is_specified(&self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for WorkplaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The subset of fields visible on a list card before its detail view is
/// revealed. Used only as a fallback source for the detail extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardSnapshot {
    /// Card title
    pub title: String,
    /// Company name
    pub company: String,
    /// Location line
    pub location: String,
    /// Absolute job URL
    pub job_url: String,
    /// Workplace badge, when visible
    pub workplace_type: WorkplaceType,
    /// Salary line, when the card shows one
    pub salary: String,
    /// Relative or absolute posting date
    pub posted_date: String,
    /// Company logo image
    pub company_logo_url: Option<String>,
}

impl CardSnapshot {
    /// A snapshot without a title cannot produce a record on any path.
    #[must_use]
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Draft populated only from card fields.
    #[must_use]
    pub fn to_draft(&self) -> JobDraft {
        let mut draft = JobDraft::default();
        draft.fill_from(self);
        draft
    }
}

/// Mutable, unvalidated field set handed to the [`Job`] factories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_url: String,
    pub description: String,
    pub salary: String,
    pub posted_date: String,
    pub company_logo_url: Option<String>,
    pub job_type: String,
    pub workplace_type: WorkplaceType,
    pub applicant_count: String,
}

impl JobDraft {
    /// Fill every empty field from the card snapshot.
    pub fn fill_from(&mut self, card: &CardSnapshot) {
        fill(&mut self.title, &card.title);
        fill(&mut self.company, &card.company);
        fill(&mut self.location, &card.location);
        fill(&mut self.job_url, &card.job_url);
        fill(&mut self.salary, &card.salary);
        fill(&mut self.posted_date, &card.posted_date);
        if self.company_logo_url.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.company_logo_url.clone_from(&card.company_logo_url);
        }
        if !self.workplace_type.is_specified() {
            self.workplace_type = card.workplace_type;
        }
    }

    /// True when the minimal triple is present after trimming.
    #[must_use]
    pub fn is_viable(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.company.trim().is_empty()
            && !self.job_url.trim().is_empty()
    }
}

fn fill(target: &mut String, source: &str) {
    if target.trim().is_empty() && !source.trim().is_empty() {
        source.clone_into(target);
    }
}

/// A normalized job posting.
///
/// Fields are private: the only way to obtain a `Job` is one of the
/// per-platform factories (or deserializing a stored record, which runs
/// through the same factory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredJob")]
pub struct Job {
    title: String,
    company: String,
    location: String,
    job_url: String,
    description: String,
    salary: String,
    posted_date: String,
    company_logo_url: Option<String>,
    platform: Platform,
    job_type: String,
    workplace_type: WorkplaceType,
    applicant_count: String,
}

impl Job {
    /// Build a LinkedIn record.
    ///
    /// Card titles carry a visually hidden duplicate and a "with
    /// verification" badge; both are removed.
    #[must_use]
    pub fn linkedin(draft: JobDraft) -> Option<Self> {
        Self::build(Platform::LinkedIn, draft, |title| {
            let title = strip_suffix_ci(&title, "with verification");
            dedupe_repeated(&title)
        })
    }

    /// Build a SEEK record.
    #[must_use]
    pub fn seek(draft: JobDraft) -> Option<Self> {
        Self::build(Platform::Seek, draft, |title| title)
    }

    /// Build an Indeed record. Indeed appends " - job post" to detail titles.
    #[must_use]
    pub fn indeed(draft: JobDraft) -> Option<Self> {
        Self::build(Platform::Indeed, draft, |title| {
            strip_suffix_ci(&title, "- job post")
        })
    }

    /// Dispatch to the factory of `platform`.
    #[must_use]
    pub fn for_platform(platform: Platform, draft: JobDraft) -> Option<Self> {
        match platform {
            Platform::LinkedIn => Self::linkedin(draft),
            Platform::Seek => Self::seek(draft),
            Platform::Indeed => Self::indeed(draft),
        }
    }

    fn build(
        platform: Platform,
        draft: JobDraft,
        clean_title: impl FnOnce(String) -> String,
    ) -> Option<Self> {
        let title = clean_title(single_line(&draft.title));
        let company = single_line(&draft.company);
        let job_url = draft.job_url.trim().to_string();

        if title.is_empty() || company.is_empty() || job_url.is_empty() {
            tracing::debug!(
                platform = %platform,
                title = %title,
                "discarding record without title, company and URL"
            );
            return None;
        }

        Some(Self {
            title,
            company,
            location: single_line(&draft.location),
            job_url,
            description: draft.description.trim().to_string(),
            salary: single_line(&draft.salary),
            posted_date: single_line(&draft.posted_date),
            company_logo_url: draft
                .company_logo_url
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            platform,
            job_type: single_line(&draft.job_type),
            workplace_type: draft.workplace_type,
            applicant_count: single_line(&draft.applicant_count),
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn job_url(&self) -> &str {
        &self.job_url
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn salary(&self) -> &str {
        &self.salary
    }

    #[must_use]
    pub fn posted_date(&self) -> &str {
        &self.posted_date
    }

    #[must_use]
    pub fn company_logo_url(&self) -> Option<&str> {
        self.company_logo_url.as_deref()
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    #[must_use]
    pub fn workplace_type(&self) -> WorkplaceType {
        self.workplace_type
    }

    #[must_use]
    pub fn applicant_count(&self) -> &str {
        &self.applicant_count
    }
}

/// Serialized shape of a [`Job`]; converted back through the factory.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredJob {
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    job_url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    salary: String,
    #[serde(default)]
    posted_date: String,
    #[serde(default)]
    company_logo_url: Option<String>,
    platform: Platform,
    #[serde(default)]
    job_type: String,
    #[serde(default)]
    workplace_type: WorkplaceType,
    #[serde(default)]
    applicant_count: String,
}

impl TryFrom<StoredJob> for Job {
    type Error = HarvestError;

    fn try_from(stored: StoredJob) -> Result<Self, Self::Error> {
        let draft = JobDraft {
            title: stored.title,
            company: stored.company,
            location: stored.location,
            job_url: stored.job_url,
            description: stored.description,
            salary: stored.salary,
            posted_date: stored.posted_date,
            company_logo_url: stored.company_logo_url,
            job_type: stored.job_type,
            workplace_type: stored.workplace_type,
            applicant_count: stored.applicant_count,
        };
        Job::for_platform(stored.platform, draft).ok_or_else(|| {
            HarvestError::Validation("stored job lacks title, company or URL".to_string())
        })
    }
}

/// Collapse internal whitespace runs to single spaces and trim.
#[must_use]
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_suffix_ci(s: &str, suffix: &str) -> String {
    let start = s.len().saturating_sub(suffix.len());
    match s.get(start..) {
        Some(tail) if tail.len() == suffix.len() && tail.eq_ignore_ascii_case(suffix) => {
            s[..start].trim_end().to_string()
        }
        _ => s.to_string(),
    }
}

/// "Data Engineer Data Engineer" -> "Data Engineer"
fn dedupe_repeated(s: &str) -> String {
    let words: Vec<&str> = s.split(' ').collect();
    if words.len() >= 2 && words.len() % 2 == 0 {
        let (a, b) = words.split_at(words.len() / 2);
        if a == b {
            return a.join(" ");
        }
    }
    s.to_string()
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, HarvestError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| HarvestError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get seconds since Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
