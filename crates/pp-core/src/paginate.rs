//! Stable page slices over an ordered result.

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One page of an ordered collection plus page-count metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Always within `1..=total_pages`.
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Slice `items` into page `page` (1-based). Out-of-range pages are clamped,
/// never rejected; a zero page size falls back to [`DEFAULT_PAGE_SIZE`].
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let current_page = page.clamp(1, total_pages);

    let start = ((current_page - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);

    Page {
        items: &items[start..end],
        current_page,
        total_pages,
        total_items,
    }
}
