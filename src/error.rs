use std::error::Error as StdError;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error coming out of a view implementation.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open listing '{url}': {source}")]
    OpenListing {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("listing step '{step}' failed: {source}")]
    Listing {
        step: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("report error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn listing<E>(step: &'static str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Listing {
            step,
            source: Box::new(source),
        }
    }
}
