//! Page numbering shared by the proxy and the normalizer.
//!
//! The provider counts pages from 0, callers count from 1. Every conversion
//! between the two goes through `CallerPage` / `UpstreamPage`.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// 1-based page number as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CallerPage(NonZeroU32);

/// 0-based page index as expected by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpstreamPage(u32);

impl CallerPage {
    pub const FIRST: CallerPage = CallerPage(NonZeroU32::MIN);

    /// Returns `None` for 0
    pub fn new(page: u32) -> Option<Self> {
        NonZeroU32::new(page).map(CallerPage)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn to_upstream(self) -> UpstreamPage {
        UpstreamPage(self.0.get() - 1)
    }
}

impl Default for CallerPage {
    fn default() -> Self {
        CallerPage::FIRST
    }
}

impl TryFrom<u32> for CallerPage {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        CallerPage::new(value).ok_or_else(|| "page numbers start at 1".to_string())
    }
}

impl From<CallerPage> for u32 {
    fn from(page: CallerPage) -> Self {
        page.get()
    }
}

impl fmt::Display for CallerPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UpstreamPage {
    pub fn new(index: u32) -> Self {
        UpstreamPage(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Saturates at `u32::MAX` instead of overflowing
    pub fn to_caller(self) -> CallerPage {
        NonZeroU32::new(self.0.saturating_add(1))
            .map(CallerPage)
            .unwrap_or(CallerPage::FIRST)
    }
}

impl From<CallerPage> for UpstreamPage {
    fn from(page: CallerPage) -> Self {
        page.to_upstream()
    }
}

impl From<UpstreamPage> for CallerPage {
    fn from(page: UpstreamPage) -> Self {
        page.to_caller()
    }
}

impl fmt::Display for UpstreamPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of pages for `total_count` items when the last response held
/// `observed_page_size` items. Always at least 1.
///
/// The page size is taken from the response rather than a constant, so a
/// short final page inflates the estimate.
pub fn total_pages(total_count: u64, observed_page_size: usize) -> u32 {
    if observed_page_size == 0 {
        return 1;
    }
    let size = observed_page_size as u64;
    let pages = total_count / size + u64::from(total_count % size != 0);
    pages.clamp(1, u64::from(u32::MAX)) as u32
}

/// One slot in a pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Number(u32),
    Gap,
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageMarker::Number(n) => write!(f, "{}", n),
            PageMarker::Gap => write!(f, "..."),
        }
    }
}

const MAX_VISIBLE_PAGES: u32 = 5;

/// Compact window of page numbers around `current`
pub fn visible_pages(current: u32, total: u32) -> Vec<PageMarker> {
    use PageMarker::{Gap, Number};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Number).collect();
    }

    let mut pages = Vec::with_capacity(7);
    if current <= 3 {
        pages.extend((1..=4).map(Number));
        pages.push(Gap);
        pages.push(Number(total));
    } else if current >= total - 2 {
        pages.push(Number(1));
        pages.push(Gap);
        pages.extend((total - 3..=total).map(Number));
    } else {
        pages.push(Number(1));
        pages.push(Gap);
        pages.extend((current - 1..=current + 1).map(Number));
        pages.push(Gap);
        pages.push(Number(total));
    }
    pages
}
