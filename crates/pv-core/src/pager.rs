//! Pure paging arithmetic over (offset, height, page size)

/// Rows shown per page
pub const PAGE_SIZE: usize = 10_000;

/// Stateless page navigation over a dataset of known height.
///
/// All methods are pure; the caller owns the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        Self { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// "Next" is enabled iff a further page start exists before the end.
    pub fn can_next(&self, offset: usize, height: usize) -> bool {
        offset + self.page_size < height
    }

    /// "Previous" is enabled iff we are not at the start.
    pub fn can_prev(&self, offset: usize) -> bool {
        offset > 0
    }

    /// Offset of the next page. Never wraps: at the last page the
    /// offset is returned unchanged.
    pub fn next_offset(&self, offset: usize, height: usize) -> usize {
        if self.can_next(offset, height) {
            offset + self.page_size
        } else {
            offset
        }
    }

    /// Offset of the previous page, clamped to 0.
    pub fn prev_offset(&self, offset: usize) -> usize {
        offset.saturating_sub(self.page_size)
    }

    /// Re-validate an offset against a dataset whose height changed.
    ///
    /// A still-valid offset is kept unchanged; an offset at or past the
    /// new end resets to the largest valid page start, not to 0.
    pub fn reclamp(&self, offset: usize, new_height: usize) -> usize {
        if new_height == 0 {
            return 0;
        }
        if offset < new_height {
            return offset;
        }
        ((new_height - 1) / self.page_size) * self.page_size
    }

    /// 1-based inclusive bounds for a "rows X-Y of Z" status line.
    /// `None` when the page at `offset` is empty.
    pub fn display_bounds(&self, offset: usize, height: usize) -> Option<(usize, usize)> {
        if offset >= height {
            return None;
        }
        Some((offset + 1, (offset + self.page_size).min(height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prev_round_trip() {
        let pager = Pager::new(100);
        // From any interior offset, next then prev returns to origin.
        for offset in [0usize, 100, 300, 700] {
            let next = pager.next_offset(offset, 1000);
            assert_eq!(pager.prev_offset(next), offset);
        }
    }

    #[test]
    fn test_boundaries_clamp() {
        let pager = Pager::new(100);
        // Offset 0 stays 0 going backwards.
        assert_eq!(pager.prev_offset(0), 0);
        assert!(!pager.can_prev(0));
        // Last page stays put going forwards.
        assert_eq!(pager.next_offset(900, 1000), 900);
        assert!(!pager.can_next(900, 1000));
        // A partial last page counts as last.
        assert!(pager.can_next(800, 950));
        assert_eq!(pager.next_offset(800, 950), 900);
        assert!(!pager.can_next(900, 950));
    }

    #[test]
    fn test_next_disabled_on_single_page() {
        let pager = Pager::new(100);
        assert!(!pager.can_next(0, 100));
        assert!(!pager.can_next(0, 1));
        assert!(!pager.can_next(0, 0));
    }

    #[test]
    fn test_reclamp_height_shrink() {
        let pager = Pager::new(100);
        // Valid offsets survive.
        assert_eq!(pager.reclamp(300, 1000), 300);
        // Shrink below the offset lands on the last valid page start,
        // not on 0.
        assert_eq!(pager.reclamp(900, 250), 200);
        assert_eq!(pager.reclamp(900, 201), 200);
        assert_eq!(pager.reclamp(900, 200), 100);
        assert_eq!(pager.reclamp(100, 50), 0);
        // Empty dataset resets to 0.
        assert_eq!(pager.reclamp(900, 0), 0);
    }

    #[test]
    fn test_display_bounds() {
        let pager = Pager::new(100);
        assert_eq!(pager.display_bounds(0, 1000), Some((1, 100)));
        assert_eq!(pager.display_bounds(900, 950), Some((901, 950)));
        assert_eq!(pager.display_bounds(0, 3), Some((1, 3)));
        assert_eq!(pager.display_bounds(950, 950), None);
        assert_eq!(pager.display_bounds(0, 0), None);
    }
}
