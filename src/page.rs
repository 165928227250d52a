//! Partitions ordered document sequences into fixed-size listing pages, and
//! owns the listing path scheme shared by the chronological and taxonomy
//! listings.
//!
//! Page numbers are 1-indexed. For `N` items and page size `P` there are
//! exactly `ceil(N / P)` pages, and an empty sequence produces zero pages
//! rather than one empty page.

use std::path::PathBuf;

use url::Url;

/// The default number of documents per listing page, used when the project
/// file doesn't configure one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice<T> {
    /// 1-indexed page number.
    pub number: usize,
    /// Total number of pages in the listing.
    pub total: usize,
    /// The items on this page, in original order.
    pub items: Vec<T>,
}

impl<T> PageSlice<T> {
    /// The previous page number, if any.
    pub fn prev(&self) -> Option<usize> {
        (self.number > 1).then(|| self.number - 1)
    }

    /// The next page number, if any.
    pub fn next(&self) -> Option<usize> {
        (self.number < self.total).then(|| self.number + 1)
    }
}

/// Partitions `items` into pages of up to `page_size` elements. `page_size`
/// is validated at configuration load and must be at least 1.
pub fn paginate<T: Clone>(items: &[T], page_size: usize) -> Vec<PageSlice<T>> {
    debug_assert!(page_size >= 1);
    let total = match items.len() % page_size {
        0 => items.len() / page_size,
        _ => items.len() / page_size + 1,
    };

    items
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| PageSlice {
            number: i + 1,
            total,
            items: chunk.to_vec(),
        })
        .collect()
}

/// The relative path prefix for a listing page: page 1 lives at the listing
/// base, later pages under `page/<n>/`.
fn page_rel(base: &str, number: usize) -> String {
    let mut rel = String::new();
    if !base.is_empty() {
        rel.push_str(base);
        rel.push('/');
    }
    if number > 1 {
        rel.push_str(&format!("page/{number}/"));
    }
    rel
}

/// The output file for page `number` of the listing rooted at `base`
/// (`""` for the chronological listing, `tag/<slug>` or `category/<slug>`
/// for taxonomy listings).
pub fn page_file(base: &str, number: usize) -> PathBuf {
    PathBuf::from(format!("{}index.html", page_rel(base, number)))
}

/// The canonical URL for page `number` of the listing rooted at `base`.
pub fn page_url(base_url: &Url, base: &str, number: usize) -> Result<Url, url::ParseError> {
    base_url.join(&page_rel(base, number))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exact_multiple() {
        let pages = paginate(&[1, 2, 3, 4], 2);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].items, [1, 2]);
        assert_eq!(pages[1].items, [3, 4]);
        assert!(pages.iter().all(|p| p.total == 2));
    }

    #[test]
    fn test_remainder_page() {
        let pages = paginate(&[1, 2, 3], 2);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].items, [3]);
    }

    #[test]
    fn test_empty_sequence_produces_zero_pages() {
        assert!(paginate::<u32>(&[], 5).is_empty());
    }

    #[test]
    fn test_page_size_one() {
        let pages = paginate(&[1, 2, 3], 1);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.items.len() == 1));
    }

    #[test]
    fn test_prev_next_links_are_consistent() {
        let pages = paginate(&(0..25).collect::<Vec<_>>(), 10);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].prev(), None);
        assert_eq!(pages[0].next(), Some(2));
        assert_eq!(pages[1].prev(), Some(1));
        assert_eq!(pages[1].next(), Some(3));
        assert_eq!(pages[2].prev(), Some(2));
        assert_eq!(pages[2].next(), None);

        // Page i's next links back to i via prev.
        for pair in pages.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1].number));
            assert_eq!(pair[1].prev(), Some(pair[0].number));
        }
    }

    #[test]
    fn test_union_covers_all_items_without_duplicates() {
        let items: Vec<u32> = (0..23).collect();
        let pages = paginate(&items, 7);
        let rejoined: Vec<u32> = pages.iter().flat_map(|p| p.items.clone()).collect();
        assert_eq!(rejoined, items);
    }

    #[test]
    fn test_page_paths() {
        assert_eq!(page_file("", 1), PathBuf::from("index.html"));
        assert_eq!(page_file("", 2), PathBuf::from("page/2/index.html"));
        assert_eq!(page_file("tag/rust", 1), PathBuf::from("tag/rust/index.html"));
        assert_eq!(
            page_file("category/notes", 3),
            PathBuf::from("category/notes/page/3/index.html"),
        );
    }

    #[test]
    fn test_page_urls() -> Result<(), url::ParseError> {
        let base = Url::parse("https://example.org/")?;
        assert_eq!(page_url(&base, "", 1)?.as_str(), "https://example.org/");
        assert_eq!(
            page_url(&base, "tag/rust", 2)?.as_str(),
            "https://example.org/tag/rust/page/2/",
        );
        Ok(())
    }
}
