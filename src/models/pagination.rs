use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PageParams {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.skip / params.limit + 1,
            per_page: params.limit,
            has_next: params.skip + params.limit < total,
            has_prev: params.skip > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_many() {
        let page = Page::new(vec![1, 2], 25, PageParams { skip: 0, limit: 10 });
        assert_eq!(page.page, 1);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn last_page() {
        let page: Page<i32> = Page::new(vec![], 25, PageParams { skip: 20, limit: 10 });
        assert_eq!(page.page, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn limit_bounds_are_validated() {
        assert!(PageParams { skip: 0, limit: 0 }.validate().is_err());
        assert!(PageParams { skip: 0, limit: 101 }.validate().is_err());
        assert!(PageParams { skip: -1, limit: 10 }.validate().is_err());
        assert!(PageParams::default().validate().is_ok());
    }
}
