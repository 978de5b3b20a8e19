//! Identifiers and records
//!
//! An [`Identifier`] names one unit of crawl work. A [`Record`] is what a
//! fetcher extracts for an identifier and what a sink persists.

use std::fmt;

/// Opaque key naming one unit of crawl work (a target URL)
///
/// Identifiers must be stable across runs: they are the ledger key and the
/// source of the per-record output name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Wraps a raw string without any normalisation
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Derives a deterministic, filesystem-safe stem from the trailing path segment
    ///
    /// The query string and fragment are dropped, trailing slashes are
    /// ignored, and every character outside `[A-Za-z0-9._-]` becomes `_`.
    /// An identifier with no usable segment maps to `index`.
    ///
    /// # Example
    ///
    /// ```
    /// use ledger_crawl::Identifier;
    ///
    /// let id = Identifier::new("https://career.habr.com/jane_doe?tab=1");
    /// assert_eq!(id.output_stem(), "jane_doe");
    /// ```
    pub fn output_stem(&self) -> String {
        let without_fragment = self.0.split('#').next().unwrap_or_default();
        let without_query = without_fragment.split('?').next().unwrap_or_default();

        let segment = without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        let stem: String = segment
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        // A bare "." or ".." would escape or alias the output directory
        if stem.is_empty() || stem.chars().all(|c| c == '.') {
            "index".to_string()
        } else {
            stem
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Structured result of fetching one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The identifier this record was produced for
    pub identifier: Identifier,

    /// Human-readable name extracted from the page
    pub display_name: String,

    /// Raw page content, uninterpreted by the coordinator
    pub payload: String,
}

impl Record {
    /// Creates a new record
    pub fn new(
        identifier: Identifier,
        display_name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            display_name: display_name.into(),
            payload: payload.into(),
        }
    }

    /// Renders the three fields in their fixed order, separated by newlines
    pub fn to_text(&self) -> String {
        [
            self.identifier.as_str(),
            self.display_name.as_str(),
            self.payload.as_str(),
        ]
        .join("\n")
    }

    /// Parses text produced by [`Record::to_text`]
    ///
    /// The payload may itself contain newlines, so only the first two
    /// separators are significant. Returns `None` when fewer than three
    /// fields are present.
    pub fn from_text(text: &str) -> Option<Self> {
        let mut fields = text.splitn(3, '\n');
        let identifier = fields.next()?;
        let display_name = fields.next()?;
        let payload = fields.next()?;

        if identifier.is_empty() {
            return None;
        }

        Some(Self::new(
            Identifier::new(identifier),
            display_name,
            payload,
        ))
    }
}
