use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_PER_PAGE: i64 = 20;
pub(crate) const MAX_PER_PAGE: i64 = 100;

/// `?page=&per_page=`; unparsable or out-of-range values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default)]
    page: Option<String>,
    #[serde(default, alias = "perPage")]
    per_page: Option<String>,
}

impl PageParams {
    pub(crate) fn new(page: i64, per_page: i64) -> Self {
        Self { page: Some(page.to_string()), per_page: Some(per_page.to_string()) }
    }

    pub(crate) fn page(&self) -> i64 {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    pub(crate) fn per_page(&self) -> i64 {
        parse_positive(self.per_page.as_deref()).unwrap_or(DEFAULT_PER_PAGE).min(MAX_PER_PAGE)
    }

    pub(crate) fn limit(&self) -> i64 {
        self.per_page()
    }

    pub(crate) fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok()).filter(|value| *value >= 1)
}

/// `?active=`; `1/true/yes` and `0/false/no`, anything else means no filter.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActiveFilter {
    #[serde(default)]
    active: Option<String>,
}

impl ActiveFilter {
    pub(crate) fn value(&self) -> Option<bool> {
        match self.active.as_deref().map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("1" | "true" | "yes") => Some(true),
            Some("0" | "false" | "no") => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Paginated<T> {
    pub(crate) items: Vec<T>,
    pub(crate) page: i64,
    pub(crate) per_page: i64,
    pub(crate) total: i64,
    pub(crate) pages: i64,
    pub(crate) has_prev: bool,
    pub(crate) has_next: bool,
    pub(crate) prev_num: Option<i64>,
    pub(crate) next_num: Option<i64>,
}

impl<T> Paginated<T> {
    pub(crate) fn new(items: Vec<T>, params: &PageParams, total: i64) -> Self {
        let page = params.page();
        let per_page = params.per_page();
        let total = total.max(0);
        let pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        let has_prev = page > 1;
        let has_next = page < pages;

        Self {
            items,
            page,
            per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }

    pub(crate) fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
            prev_num: self.prev_num,
            next_num: self.next_num,
        }
    }
}
