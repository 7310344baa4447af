use serde::Serialize;

/// One slot in the page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Items on the 1-based `page`; empty when the page is out of range.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// Page numbers to render for `current` of `total`.
///
/// Up to `max_visible` pages are listed in full. Past that, the strip keeps
/// the first and last page and a window around `current`:
/// `1 2 3 … N`, `1 … N-2 N-1 N` or `1 … p-1 p p+1 … N`.
pub fn page_numbers(current: usize, total: usize, max_visible: usize) -> Vec<PageItem> {
    if total <= max_visible {
        return (1..=total).map(PageItem::Page).collect();
    }

    let mut items = Vec::with_capacity(7);
    if current <= 3 {
        items.extend((1..=3).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    } else if current >= total - 2 {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((total - 2..=total).map(PageItem::Page));
    } else {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((current - 1..=current + 1).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    #[test]
    fn test_seventeen_items_in_pages_of_eight() {
        let items = (0..17).collect::<Vec<_>>();
        assert_eq!(total_pages(items.len(), 8), 3);

        let sizes = (1..=3)
            .map(|page| page_slice(&items, page, 8).len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![8, 8, 1]);
        assert_eq!(page_slice(&items, 3, 8), &[16]);
        assert!(page_slice(&items, 4, 8).is_empty());
        assert!(page_slice(&items, 0, 8).is_empty());
    }

    #[test]
    fn test_empty_list_has_no_pages() {
        assert_eq!(total_pages(0, 8), 0);
        assert!(page_numbers(1, 0, 5).is_empty());
    }

    #[test]
    fn test_short_strip_lists_every_page() {
        assert_eq!(
            page_numbers(2, 5, 5),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5)]
        );
    }

    #[test]
    fn test_strip_near_start() {
        assert_eq!(
            page_numbers(3, 10, 5),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn test_strip_near_end() {
        assert_eq!(
            page_numbers(8, 10, 5),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn test_strip_in_the_middle() {
        assert_eq!(
            page_numbers(5, 10, 5),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }
}
