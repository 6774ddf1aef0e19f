use std::ops::Range;

pub const PAGE_SIZE: usize = 10;

/// 1-based page cursor over the filtered records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.page_size)
    }

    /// Moves to `page` if it exists. Out of range requests are ignored.
    pub fn paginate(&mut self, page: usize, item_count: usize) -> bool {
        if page >= 1 && page <= self.total_pages(item_count) {
            self.current_page = page;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self, item_count: usize) -> bool {
        self.paginate(self.current_page + 1, item_count)
    }

    pub fn previous(&mut self, item_count: usize) -> bool {
        self.paginate(self.current_page.saturating_sub(1), item_count)
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn bounds(&self, item_count: usize) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(item_count);
        let end = (start + self.page_size).min(item_count);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.bounds(items.len())]
    }
}
