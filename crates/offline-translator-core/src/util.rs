//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Whether `text` has anything other than whitespace.
pub fn has_visible_text(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace())
}

/// Copy the translated output to a user-chosen location.
///
/// Creates missing parent directories. Returns the number of bytes copied.
pub fn copy_output(from: &std::path::Path, to: &std::path::Path) -> std::io::Result<u64> {
    if let Some(parent) = to.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_has_visible_text() {
        assert!(!has_visible_text(""));
        assert!(!has_visible_text(" \n\t "));
        assert!(has_visible_text("  a "));
    }

    #[test]
    fn test_copy_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("translated.pdf");
        std::fs::write(&src, b"%PDF-1.5").unwrap();

        let dest = dir.path().join("nested").join("copy.pdf");
        let copied = copy_output(&src, &dest).unwrap();

        assert_eq!(copied, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5");
    }
}
