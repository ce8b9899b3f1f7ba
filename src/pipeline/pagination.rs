//! Pagination controller.
//!
//! Pages are 1-based. Moving past either end is a no-op, and any change of
//! page size or filter puts the reader back on page 1.

/// Number of pages needed for `total` items.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Items shown on `page`.
pub fn window<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Snapshot of pagination controls for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub current: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
}

impl PageState {
    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    /// Controls are hidden when there is nothing to page through.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 0
    }
}

/// Current page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Change the page size and return to page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.reset();
    }

    /// Advance one page; `false` at the last page.
    pub fn next(&mut self, total_items: usize) -> bool {
        if self.page >= page_count(total_items, self.page_size) {
            return false;
        }
        self.page += 1;
        true
    }

    /// Go back one page; `false` at page 1.
    pub fn prev(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Jump to `page` if it exists.
    pub fn go_to(&mut self, page: usize, total_items: usize) -> bool {
        if page == 0 || page > page_count(total_items, self.page_size) {
            return false;
        }
        self.page = page;
        true
    }

    pub fn state(&self, total_items: usize) -> PageState {
        PageState {
            current: self.page,
            total_pages: page_count(total_items, self.page_size),
            page_size: self.page_size,
            total_items,
        }
    }

    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        window(items, self.page, self.page_size)
    }
}
