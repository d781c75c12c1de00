use thiserror::Error;

/// Fatal extraction errors.
///
/// Raised when a page that was fetched successfully does not have the shape
/// the extraction expects. Unlike a failed fetch, these abort the whole mode.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("tag not found: {query}")]
    TagNotFound { query: String },

    #[error("row {row} has {found} cells, expected at least {expected}")]
    MissingCell {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("<{tag}> has no '{attr}' attribute")]
    MissingAttribute { tag: String, attr: &'static str },

    #[error("cannot resolve link '{href}': {source}")]
    BadLink {
        href: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no list containing '{marker}' was found")]
    MarkerNotFound { marker: String },

    #[error("index status code '{code}' has no expected statuses configured")]
    UnknownStatusCode { code: String },

    #[error("no value follows the '{label}' term")]
    MissingValue { label: String },
}
