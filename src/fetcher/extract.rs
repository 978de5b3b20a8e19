//! Display-name extraction from fetched HTML

use crate::ConfigError;
use scraper::{Html, Selector};

/// Parses a CSS selector, mapping failures to a configuration error
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Returns the text of the first element matching `selector`
///
/// Whitespace runs inside the text are collapsed to single spaces. Returns
/// `None` when nothing matches or the matching element has no text.
pub fn extract_display_name(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .next()
        .map(|element| {
            element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}
