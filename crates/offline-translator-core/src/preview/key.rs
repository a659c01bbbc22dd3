/// Cache key for a rendered preview page.
///
/// Built from the document's content identity rather than its path, so a
/// file replaced on disk under the same name never hits stale renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    doc_id: String,
    page: usize,
    dpi: u32,
}

impl PageKey {
    pub fn new(doc_id: impl Into<String>, page: usize, dpi: u32) -> Self {
        Self {
            doc_id: doc_id.into(),
            page,
            dpi,
        }
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}@{}", self.doc_id, self.page, self.dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_differs_by_page_and_dpi() {
        assert_ne!(PageKey::new("doc", 1, 100), PageKey::new("doc", 2, 100));
        assert_ne!(PageKey::new("doc", 1, 100), PageKey::new("doc", 1, 200));
    }

    #[test]
    fn test_key_differs_by_document() {
        assert_ne!(PageKey::new("aaa", 1, 100), PageKey::new("bbb", 1, 100));
    }

    #[test]
    fn test_display() {
        assert_eq!(PageKey::new("abc", 3, 100).to_string(), "abc#3@100");
    }
}
