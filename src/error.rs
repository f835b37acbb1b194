use std::time::Duration;

use thiserror::Error;

/// Failure reaching a page. One attempt per page, no retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// `after` prints as `200ms` / `15s`, so sub-second limits stay readable.
    #[error("timed out after {after:?} fetching {url}")]
    Timeout { url: String, after: Duration },
}

/// Expected structure missing from fetched markup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("required field `{0}` not found")]
    MissingField(&'static str),

    #[error("unrecognized page layout")]
    UnrecognizedLayout,

    #[error("listing contains no atlas entry links")]
    EmptyIndex,

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Assembled record breaks an invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("flashcard title is empty")]
    EmptyTitle,

    #[error("could not derive an id from {0}")]
    EmptyId(String),

    #[error("id `{0}` already produced by an earlier entry")]
    DuplicateId(String),
}

/// Everything that can sink a single entry. Caught at the entry boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl EntryError {
    /// Short stage name used in the run summary.
    pub fn stage(&self) -> &'static str {
        match self {
            EntryError::Fetch(_) => "fetch",
            EntryError::Parse(_) => "parse",
            EntryError::Validation(_) => "validate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        let e: EntryError = FetchError::Timeout {
            url: "https://eyerounds.org/x".into(),
            after: Duration::from_secs(15),
        }
        .into();
        assert_eq!(e.stage(), "fetch");
        assert_eq!(e.to_string(), "timed out after 15s fetching https://eyerounds.org/x");

        let short = FetchError::Timeout {
            url: "https://eyerounds.org/x".into(),
            after: Duration::from_millis(200),
        };
        assert_eq!(short.to_string(), "timed out after 200ms fetching https://eyerounds.org/x");

        let e: EntryError = ParseError::MissingField("title").into();
        assert_eq!(e.stage(), "parse");
        assert_eq!(e.to_string(), "required field `title` not found");

        let e: EntryError = ValidationError::EmptyTitle.into();
        assert_eq!(e.stage(), "validate");
    }
}
