//! Session configuration.

/// Selector for the elements narrated by default: images, links, the top
/// three heading levels and inline spans.
pub const DEFAULT_NARRATION_SELECTOR: &str = "img, a, h1, h2, h3, span";

/// Characters per page for [`crate::PaginatedBook`].
pub const DEFAULT_CHARS_PER_PAGE: usize = 1024;

/// Settings shared by the indexer and the reference engine.
///
/// ```
/// use readsync::ReaderConfig;
///
/// let config = ReaderConfig::new()
///     .with_chars_per_page(600)
///     .with_selector("h1, h2, img");
/// assert_eq!(config.chars_per_page, 600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Page size used when paginating by character count. Never below 1.
    pub chars_per_page: usize,
    /// Selector list choosing narratable elements.
    pub selector: String,
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chars_per_page(mut self, chars: usize) -> Self {
        self.chars_per_page = chars.max(1);
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chars_per_page: DEFAULT_CHARS_PER_PAGE,
            selector: DEFAULT_NARRATION_SELECTOR.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(ReaderConfig::new().with_chars_per_page(0).chars_per_page, 1);
    }
}
