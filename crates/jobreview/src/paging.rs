//! Page cursor, page slicing and the page-index window.

use serde::{Deserialize, Serialize};

/// Default number of pages shown on each side of an anchor page.
pub const DEFAULT_RADIUS: u32 = 3;

/// One entry of the page-index window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageItem {
    #[serde(rename_all = "camelCase")]
    Page {
        number: u32,
        current: bool,
        /// Hidden on narrow displays; still part of the sequence.
        compact_hidden: bool,
    },
    /// Stands in for a run of skipped pages.
    Ellipsis,
}

/// Paging position over a collection of `total_count` items.
///
/// `current_page` is 1-based and kept inside `[1, max(1, max_pages)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    current_page: u32,
    page_size: u32,
    total_count: u64,
}

impl PageCursor {
    /// A cursor on page 1 of an empty collection. A zero page size is
    /// raised to 1.
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// `ceil(total_count / page_size)`.
    pub fn max_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    fn clamp(&mut self) {
        let upper = self.max_pages().max(1);
        self.current_page = self.current_page.clamp(1, upper);
    }

    /// Updates the total and re-clamps the current page.
    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
        self.clamp();
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.clamp();
    }

    /// Moves to `page`, clamped into range. Returns the page actually set.
    pub fn set_page(&mut self, page: u32) -> u32 {
        self.current_page = page;
        self.clamp();
        self.current_page
    }

    /// Offset of the first item on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.page_size)
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        (self.current_page < self.max_pages()).then(|| self.current_page + 1)
    }

    /// 1-based bounds of the items on the current page, for a
    /// "showing X to Y of N" line. `None` for an empty collection.
    pub fn showing_range(&self) -> Option<(u64, u64)> {
        if self.total_count == 0 {
            return None;
        }
        let first = self.offset() + 1;
        let last = (self.offset() + u64::from(self.page_size)).min(self.total_count);
        Some((first, last))
    }

    /// Page-index window around the first page, the current page and the
    /// last page. See [`page_window`].
    pub fn window(&self, radius: u32) -> Vec<PageItem> {
        page_window(self.current_page, self.max_pages(), radius)
    }
}

/// Builds the page-index sequence for `max_pages` pages.
///
/// Emits every page within `radius` of page 1, of `current` and of
/// `max_pages`. Each run of skipped pages becomes one [`PageItem::Ellipsis`].
/// Pages that are only there because they sit near the first or last page
/// (other than pages 1 and `max_pages` themselves) are flagged
/// `compact_hidden`.
pub fn page_window(current: u32, max_pages: u32, radius: u32) -> Vec<PageItem> {
    let mut items = Vec::new();
    if max_pages == 0 {
        return items;
    }
    let current = current.clamp(1, max_pages);
    let near_current = |page: u32| page.abs_diff(current) <= radius;

    // Only the pages near the three anchors are visited, so the cost does not
    // grow with `max_pages`.
    let mut ranges = [
        (1, radius.saturating_add(1)),
        (current.saturating_sub(radius), current.saturating_add(radius)),
        (max_pages.saturating_sub(radius), max_pages),
    ]
    .map(|(low, high)| (low.max(1), high.min(max_pages)));
    ranges.sort_unstable();

    let mut last: Option<u32> = None;
    for (low, high) in ranges {
        let start = match last {
            Some(last) if last >= high => continue,
            Some(last) if last + 1 >= low => last + 1,
            Some(_) => {
                items.push(PageItem::Ellipsis);
                low
            }
            None => low,
        };
        for page in start..=high {
            let edge = page == 1 || page == max_pages;
            items.push(PageItem::Page {
                number: page,
                current: page == current,
                compact_hidden: !near_current(page) && !edge,
            });
        }
        last = Some(high);
    }
    items
}

/// The slice of `items` that falls on the cursor's current page.
pub fn paginate<'a, T>(items: &'a [T], cursor: &PageCursor) -> &'a [T] {
    let start = usize::try_from(cursor.offset())
        .unwrap_or(usize::MAX)
        .min(items.len());
    let end = start
        .saturating_add(cursor.page_size() as usize)
        .min(items.len());
    &items[start..end]
}
