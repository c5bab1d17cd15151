use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.per_page()
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

#[derive(Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        let q = PageQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(q.limit(), 50);
        assert_eq!(q.offset(), 0);

        let q = PageQuery {
            page: Some(3),
            per_page: Some(1000),
        };
        assert_eq!(q.limit(), 200);
        assert_eq!(q.offset(), 400);

        let q = PageQuery {
            page: Some(0),
            per_page: Some(-5),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 1);
    }
}
