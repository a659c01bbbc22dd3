//! Page index newtype bridging 1-based page numbers and MuPDF's `i32` indices.
//!
//! Every public API in this crate speaks 1-based page numbers, the way a
//! reader counts pages. MuPDF loads pages by 0-based `i32`. `PageIndex` is the
//! single place that conversion happens and where bounds are checked.

use std::fmt;

use crate::error::Error;

/// A validated, 0-based page index that can be handed to mupdf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate a 1-based page number against the document's page count.
    ///
    /// Page 0, pages past `total_pages` and numbers that do not fit in an
    /// `i32` all yield [`Error::PageOutOfRange`].
    pub fn try_from_page_number(page: usize, total_pages: usize) -> Result<Self, Error> {
        let out_of_range = || Error::PageOutOfRange {
            page,
            total: total_pages,
        };

        if page == 0 || page > total_pages {
            return Err(out_of_range());
        }

        let index = i32::try_from(page - 1).map_err(|_| out_of_range())?;
        Ok(Self(index))
    }

    /// Get the underlying 0-based i32 value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// The 1-based page number this index was built from.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // never negative: only built through try_from_page_number
    pub const fn page_number(self) -> usize {
        self.0 as usize + 1
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.page_number())
    }
}
