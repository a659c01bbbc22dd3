//! Paged preview of a PDF: one rendered page at a time with a navigation
//! cursor, backed by an in-memory cache of rendered pages.

mod key;

pub use key::PageKey;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use moka::sync::Cache;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pdf::{DocumentReader, MupdfRasterizer, MupdfReader, Rasterizer};

/// Current page within a document of `total` pages.
///
/// `current` stays within `1..=total` whenever the document has pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewCursor {
    current: usize,
    total: usize,
}

impl PreviewCursor {
    pub const fn new(total: usize) -> Self {
        Self {
            current: if total == 0 { 0 } else { 1 },
            total,
        }
    }

    pub const fn current(&self) -> usize {
        self.current
    }

    pub const fn total(&self) -> usize {
        self.total
    }

    /// Advance one page; returns false at the last page.
    pub const fn next(&mut self) -> bool {
        if self.current < self.total {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; returns false at the first page.
    pub const fn previous(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn set(&mut self, page: usize) -> Result<()> {
        if page == 0 || page > self.total {
            return Err(Error::PageOutOfRange {
                page,
                total: self.total,
            });
        }
        self.current = page;
        Ok(())
    }

    pub const fn navigation_enabled(&self) -> bool {
        self.total > 1
    }
}

impl std::fmt::Display for PreviewCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Page {} of {}", self.current, self.total)
    }
}

#[derive(Debug, Clone)]
struct PreviewDocument {
    path: PathBuf,
    cache_id: String,
}

/// One preview slot (original or translated).
///
/// Holds at most one open document. Only the displayed page image is owned
/// here; other rendered pages live in the cache until evicted.
pub struct PagedPreviewCache {
    reader: Arc<dyn DocumentReader>,
    rasterizer: Arc<dyn Rasterizer>,
    dpi: u32,
    document: Option<PreviewDocument>,
    cursor: PreviewCursor,
    pages: Cache<PageKey, Arc<RgbaImage>>,
    displayed: Option<Arc<RgbaImage>>,
}

impl PagedPreviewCache {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        rasterizer: Arc<dyn Rasterizer>,
        dpi: u32,
        max_cached_pages: u64,
    ) -> Self {
        Self {
            reader,
            rasterizer,
            dpi,
            document: None,
            cursor: PreviewCursor::new(0),
            pages: Cache::new(max_cached_pages),
            displayed: None,
        }
    }

    /// MuPDF-backed preview slot
    pub fn with_mupdf(dpi: u32, max_cached_pages: u64) -> Self {
        Self::new(
            Arc::new(MupdfReader),
            Arc::new(MupdfRasterizer),
            dpi,
            max_cached_pages,
        )
    }

    /// Open a document, replacing whatever was shown before.
    ///
    /// The cursor resets to page 1. On failure the slot is left empty.
    pub fn open(&mut self, path: &Path) -> Result<usize> {
        self.pages.invalidate_all();
        self.displayed = None;

        let source = match self.reader.open(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Preview of {} failed: {}", path.display(), e);
                self.document = None;
                self.cursor = PreviewCursor::new(0);
                return Err(e);
            }
        };

        let total = source.page_count();
        debug!("Preview opened {} ({} pages)", path.display(), total);
        self.document = Some(PreviewDocument {
            path: path.to_path_buf(),
            cache_id: source.cache_id().to_string(),
        });
        self.cursor = PreviewCursor::new(total);
        Ok(total)
    }

    /// Render (or fetch from cache) a 1-based page and make it current.
    ///
    /// Renders are cached only when the file still matches the document
    /// that was opened; otherwise [`Error::DocumentChanged`] is returned and
    /// the current page is kept.
    pub fn show(&mut self, page: usize) -> Result<&RgbaImage> {
        let Some(document) = &self.document else {
            return Err(Error::PageOutOfRange { page, total: 0 });
        };
        if page == 0 || page > self.cursor.total() {
            return Err(Error::PageOutOfRange {
                page,
                total: self.cursor.total(),
            });
        }

        let key = PageKey::new(document.cache_id.as_str(), page, self.dpi);
        let image = if let Some(image) = self.pages.get(&key) {
            debug!("Preview cache hit for {}", key);
            image
        } else {
            let image = self
                .rasterizer
                .render(&document.path, &document.cache_id, page, self.dpi)
                .inspect_err(|e| warn!("Preview of page {} not rendered: {}", page, e))?;
            let image = Arc::new(image);
            self.pages.insert(key, Arc::clone(&image));
            image
        };

        self.cursor.set(page)?;
        Ok(&**self.displayed.insert(image))
    }

    /// Move forward and render; `None` when already on the last page.
    pub fn next(&mut self) -> Result<Option<&RgbaImage>> {
        let mut cursor = self.cursor;
        if !cursor.next() {
            return Ok(None);
        }
        self.show(cursor.current()).map(Some)
    }

    /// Move back and render; `None` when already on the first page.
    pub fn previous(&mut self) -> Result<Option<&RgbaImage>> {
        let mut cursor = self.cursor;
        if !cursor.previous() {
            return Ok(None);
        }
        self.show(cursor.current()).map(Some)
    }

    pub fn displayed(&self) -> Option<&RgbaImage> {
        self.displayed.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.document.as_ref().map(|d| d.path.as_path())
    }

    pub const fn cursor(&self) -> PreviewCursor {
        self.cursor
    }

    pub const fn current_page(&self) -> usize {
        self.cursor.current()
    }

    pub const fn total_pages(&self) -> usize {
        self.cursor.total()
    }

    pub const fn navigation_enabled(&self) -> bool {
        self.cursor.navigation_enabled()
    }

    pub const fn dpi(&self) -> u32 {
        self.dpi
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::PageTextSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        pages: usize,
        id: String,
    }

    impl PageTextSource for FakeSource {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn cache_id(&self) -> &str {
            &self.id
        }

        fn page_text(&self, _page: usize) -> Result<String> {
            Ok(String::new())
        }
    }

    /// Content version of the file on disk, shared by reader and rasterizer.
    type Version = Arc<AtomicUsize>;

    fn version_id(version: &Version) -> String {
        format!("v{}", version.load(Ordering::SeqCst))
    }

    struct FakeReader {
        pages: usize,
        version: Version,
    }

    impl DocumentReader for FakeReader {
        fn open(&self, path: &Path) -> Result<Box<dyn PageTextSource>> {
            if path.ends_with("broken.pdf") {
                return Err(Error::UnreadableDocument {
                    path: path.to_path_buf(),
                    reason: "not a PDF".to_string(),
                });
            }
            Ok(Box::new(FakeSource {
                pages: self.pages,
                id: version_id(&self.version),
            }))
        }
    }

    struct CountingRasterizer {
        renders: AtomicUsize,
        version: Version,
    }

    impl Rasterizer for CountingRasterizer {
        fn render(&self, path: &Path, doc_id: &str, page: usize, _dpi: u32) -> Result<RgbaImage> {
            if doc_id != version_id(&self.version) {
                return Err(Error::DocumentChanged {
                    path: path.to_path_buf(),
                });
            }
            self.renders.fetch_add(1, Ordering::SeqCst);
            let width = u32::try_from(page).unwrap();
            Ok(RgbaImage::new(width, 1))
        }
    }

    fn preview(pages: usize) -> (PagedPreviewCache, Arc<CountingRasterizer>) {
        let version = Version::default();
        let rasterizer = Arc::new(CountingRasterizer {
            renders: AtomicUsize::new(0),
            version: version.clone(),
        });
        let cache = PagedPreviewCache::new(
            Arc::new(FakeReader { pages, version }),
            rasterizer.clone(),
            100,
            8,
        );
        (cache, rasterizer)
    }

    #[test]
    fn test_cursor_clamps_at_both_ends() {
        let mut cursor = PreviewCursor::new(3);
        assert!(!cursor.previous());
        assert_eq!(cursor.current(), 1);
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert_eq!(cursor.current(), 3);
    }

    #[test]
    fn test_cursor_label() {
        assert_eq!(PreviewCursor::new(5).to_string(), "Page 1 of 5");
    }

    #[test]
    fn test_single_page_disables_navigation() {
        assert!(!PreviewCursor::new(1).navigation_enabled());
        assert!(PreviewCursor::new(2).navigation_enabled());
    }

    #[test]
    fn test_show_caches_rendered_pages() {
        let (mut cache, rasterizer) = preview(3);
        cache.open(Path::new("doc.pdf")).unwrap();

        cache.show(2).unwrap();
        cache.show(1).unwrap();
        let image = cache.show(2).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(rasterizer.renders.load(Ordering::SeqCst), 2);
        assert_eq!(cache.current_page(), 2);
    }

    #[test]
    fn test_next_and_previous_stop_at_bounds() {
        let (mut cache, _) = preview(2);
        cache.open(Path::new("doc.pdf")).unwrap();
        cache.show(1).unwrap();

        assert!(cache.previous().unwrap().is_none());
        assert_eq!(cache.next().unwrap().map(RgbaImage::width), Some(2));
        assert!(cache.next().unwrap().is_none());
        assert_eq!(cache.current_page(), 2);
    }

    #[test]
    fn test_reopen_resets_cursor() {
        let (mut cache, _) = preview(4);
        cache.open(Path::new("doc.pdf")).unwrap();
        cache.show(3).unwrap();

        cache.open(Path::new("doc.pdf")).unwrap();
        assert_eq!(cache.current_page(), 1);
        assert!(cache.displayed().is_none());
    }

    #[test]
    fn test_failed_open_clears_slot() {
        let (mut cache, _) = preview(2);
        cache.open(Path::new("doc.pdf")).unwrap();
        cache.show(1).unwrap();

        assert!(cache.open(Path::new("broken.pdf")).is_err());
        assert!(cache.path().is_none());
        assert!(cache.displayed().is_none());
        assert_eq!(cache.total_pages(), 0);
    }

    #[test]
    fn test_replaced_file_is_not_cached_under_old_identity() {
        let (mut cache, rasterizer) = preview(3);
        cache.open(Path::new("translated.pdf")).unwrap();
        cache.show(1).unwrap();

        // Another job overwrites the file before the preview is reopened
        rasterizer.version.fetch_add(1, Ordering::SeqCst);
        assert!(matches!(cache.show(2), Err(Error::DocumentChanged { .. })));
        assert_eq!(cache.current_page(), 1);
        assert_eq!(cache.displayed().map(RgbaImage::width), Some(1));
        assert!(!cache.pages.contains_key(&PageKey::new("v0", 2, 100)));

        cache.open(Path::new("translated.pdf")).unwrap();
        assert_eq!(cache.show(2).unwrap().width(), 2);
        assert_eq!(rasterizer.renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_out_of_range_page_rejected() {
        let (mut cache, _) = preview(2);
        assert!(matches!(cache.show(1), Err(Error::PageOutOfRange { total: 0, .. })));

        cache.open(Path::new("doc.pdf")).unwrap();
        assert!(matches!(cache.show(3), Err(Error::PageOutOfRange { page: 3, total: 2 })));
        assert!(matches!(cache.show(0), Err(Error::PageOutOfRange { .. })));
    }
}
