//! Page slicing for fully computed result lists.

use crate::config::QueryConfig;

/// One page of an ordered result list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

/// Page-size policy: `default` for missing/invalid input, valid range `1..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub default: usize,
    pub max: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default: 20,
            max: 100,
        }
    }
}

impl From<&QueryConfig> for PageLimits {
    fn from(cfg: &QueryConfig) -> Self {
        Self {
            default: cfg.default_page_size,
            max: cfg.max_page_size,
        }
    }
}

impl PageLimits {
    /// Requested page size: above `max` is capped, zero/negative falls back to `default`.
    pub fn page_size(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(n) if n > 0 => (n as u64).min(self.max as u64) as usize,
            _ => self.default,
        }
    }
}

/// 1-based page number; missing or `<= 0` means the first page.
pub fn page_number(requested: Option<i64>) -> usize {
    match requested {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => 1,
    }
}

/// Parse a raw page/page-size parameter. Unparsable input counts as absent.
pub fn parse_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Slice `items` to the requested page.
///
/// Pages past the end come back empty with `has_more == false`.
pub fn paginate<T>(
    items: Vec<T>,
    page: Option<i64>,
    page_size: Option<i64>,
    limits: PageLimits,
) -> Page<T> {
    let page = page_number(page);
    let page_size = limits.page_size(page_size);
    let total_count = items.len();

    let start = (page - 1).saturating_mul(page_size).min(total_count);
    let end = start.saturating_add(page_size).min(total_count);

    let items = if start >= end {
        Vec::new()
    } else {
        items.into_iter().skip(start).take(end - start).collect()
    };

    Page {
        items,
        total_count,
        page,
        page_size,
        has_more: end < total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn last_partial_page() {
        let p = paginate(numbers(25), Some(3), Some(10), PageLimits::default());
        assert_eq!(p.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(p.total_count, 25);
        assert!(!p.has_more);
    }

    #[test]
    fn middle_page_has_more() {
        let p = paginate(numbers(25), Some(2), Some(10), PageLimits::default());
        assert_eq!(p.items, (10..20).collect::<Vec<_>>());
        assert!(p.has_more);
    }

    #[test]
    fn page_beyond_range_is_empty() {
        let p = paginate(numbers(25), Some(10), Some(10), PageLimits::default());
        assert!(p.items.is_empty());
        assert!(!p.has_more);
        assert_eq!(p.page, 10);
    }

    #[test]
    fn empty_input() {
        let p = paginate(Vec::<u8>::new(), None, None, PageLimits::default());
        assert!(p.items.is_empty());
        assert_eq!(p.total_count, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 20);
        assert!(!p.has_more);
    }

    #[test]
    fn oversized_page_size_is_capped() {
        let p = paginate(numbers(250), Some(1), Some(500), PageLimits::default());
        assert_eq!(p.page_size, 100);
        assert_eq!(p.items.len(), 100);
        assert!(p.has_more);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let p = paginate(numbers(30), Some(0), Some(-5), PageLimits::default());
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 20);
        assert_eq!(p.items.len(), 20);

        assert_eq!(parse_param(Some("abc")), None);
        assert_eq!(parse_param(Some(" 7 ")), Some(7));
        assert_eq!(parse_param(None), None);
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let p = paginate(numbers(5), Some(i64::MAX), Some(100), PageLimits::default());
        assert!(p.items.is_empty());
        assert!(!p.has_more);
    }
}
