#![forbid(unsafe_code)]

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page selection. `page` 0 and 1 both address the first page and
/// a `size` of 0 selects the default page size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
}

impl Pagination {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn limit(&self) -> u32 {
        match self.size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        let page = self.page.max(1) - 1;
        u64::from(page) * u64::from(self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_select_first_page_of_default_size() {
        let pagination = Pagination::default();
        assert_eq!(pagination.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn pages_are_one_based_and_size_is_capped() {
        assert_eq!(Pagination::new(1, 2).offset(), 0);
        assert_eq!(Pagination::new(2, 2).offset(), 2);
        assert_eq!(Pagination::new(3, 2).offset(), 4);
        assert_eq!(Pagination::new(1, 5000).limit(), MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(2, 5000).offset(), u64::from(MAX_PAGE_SIZE));
    }
}
