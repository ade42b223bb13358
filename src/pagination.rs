//! Pagination arithmetic shared by the directory and search listings.

use std::collections::BTreeMap;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// A clamped page request: `page >= 1`, `limit` in `[1, MAX_LIMIT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1, DEFAULT_LIMIT)
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> PageRequest {
        PageRequest {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Read `page`/`limit` from decoded query parameters. Untrusted values
    /// that fail to parse fall back to the defaults.
    pub fn from_query_params(params: &BTreeMap<String, String>) -> PageRequest {
        let page = params
            .get("page")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1);
        let limit = params
            .get("limit")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_LIMIT);
        PageRequest::new(page, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Same limit, page clamped into `[1, total_pages]` for the given total.
    pub fn clamped_to(&self, total: u64) -> PageRequest {
        let info = PageInfo::compute(total, self);
        PageRequest::new(info.page, self.limit)
    }
}

/// Display arithmetic for one page of a counted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    /// 1-based display range; `from == 0` when the result set is empty.
    pub from: u64,
    pub to: u64,
}

impl PageInfo {
    pub fn compute(total: u64, request: &PageRequest) -> PageInfo {
        let limit = request.limit as u64;
        let total_pages = (total.div_ceil(limit)).max(1) as u32;
        let page = request.page.min(total_pages);
        let from = if total == 0 {
            0
        } else {
            (page as u64 - 1) * limit + 1
        };
        let to = (page as u64 * limit).min(total);
        PageInfo {
            page,
            total_pages,
            total,
            from,
            to,
        }
    }
}

// ── Tests ──
