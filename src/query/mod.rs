//! Query-string codec for list views.
//!
//! List state (search, sort, paging) is a plain value that round-trips
//! through a URL query string, so a view can be bookmarked or shared and is
//! restored exactly when the string is decoded again. Defaults are omitted
//! from the encoded form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::errors::{Result, WishError};
use crate::storage::DraftInfo;

pub const DEFAULT_PER_PAGE: usize = 20;
const MAX_PER_PAGE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    SavedAt,
    Wizard,
    Step,
}

impl SortKey {
    fn as_str(self) -> &'static str {
        match self {
            SortKey::SavedAt => "saved_at",
            SortKey::Wizard => "wizard",
            SortKey::Step => "step",
        }
    }
}

impl FromStr for SortKey {
    type Err = WishError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "saved_at" => Ok(SortKey::SavedAt),
            "wizard" => Ok(SortKey::Wizard),
            "step" => Ok(SortKey::Step),
            other => Err(WishError::InvalidInput(format!(
                "unknown sort field `{}` (expected saved_at, wizard or step)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: SortKey,
    pub descending: bool,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: SortKey::SavedAt,
            descending: true,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of a filtered, sorted listing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

impl ListQuery {
    /// Parses `q=..&sort=-saved_at&page=2&per_page=10`. A leading `-` on the
    /// sort field means descending. Unknown keys are ignored.
    pub fn decode(query: &str) -> Result<Self> {
        let mut parsed = ListQuery::default();
        let trimmed = query.trim().trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(trimmed.as_bytes()) {
            match &*key {
                "q" => {
                    let search = value.trim();
                    parsed.search = (!search.is_empty()).then(|| search.to_string());
                }
                "sort" => {
                    let (descending, field) = match value.strip_prefix('-') {
                        Some(field) => (true, field),
                        None => (false, &*value),
                    };
                    parsed.sort = field.parse()?;
                    parsed.descending = descending;
                }
                "page" => parsed.page = parse_positive("page", &value)?,
                "per_page" => {
                    parsed.per_page = parse_positive("per_page", &value)?.min(MAX_PER_PAGE)
                }
                other => tracing::debug!(key = other, "ignoring unknown query key"),
            }
        }
        Ok(parsed)
    }

    pub fn encode(&self) -> String {
        let defaults = ListQuery::default();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(search) = &self.search {
            serializer.append_pair("q", search);
        }
        if self.sort != defaults.sort || self.descending != defaults.descending {
            let prefix = if self.descending { "-" } else { "" };
            serializer.append_pair("sort", &format!("{}{}", prefix, self.sort.as_str()));
        }
        if self.page != defaults.page {
            serializer.append_pair("page", &self.page.to_string());
        }
        if self.per_page != defaults.per_page {
            serializer.append_pair("per_page", &self.per_page.to_string());
        }
        serializer.finish()
    }

    /// Filters by case-insensitive wizard name, sorts and slices one page.
    pub fn apply(&self, drafts: Vec<DraftInfo>) -> QueryPage<DraftInfo> {
        let needle = self.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<DraftInfo> = drafts
            .into_iter()
            .filter(|info| {
                needle
                    .as_deref()
                    .map_or(true, |needle| info.wizard.to_lowercase().contains(needle))
            })
            .collect();
        matching.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = matching.len();
        let per_page = self.per_page.max(1);
        let pages = total.div_ceil(per_page).max(1);
        let items = matching
            .into_iter()
            .skip((self.page.saturating_sub(1)) * per_page)
            .take(per_page)
            .collect();
        QueryPage {
            items,
            total,
            page: self.page,
            pages,
        }
    }

    fn compare(&self, a: &DraftInfo, b: &DraftInfo) -> Ordering {
        match self.sort {
            SortKey::SavedAt => a.saved_at.cmp(&b.saved_at),
            SortKey::Wizard => a.wizard.cmp(&b.wizard),
            SortKey::Step => a.step.cmp(&b.step),
        }
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            WishError::InvalidInput(format!("`{}` must be a positive number, got `{}`", key, raw))
        })
}
