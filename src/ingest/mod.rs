pub mod payload;
pub mod service;

pub use service::{IngestReport, IngestService};

use crate::db::writer::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid JSON payload; expected an object or an array of objects: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("received empty data list")]
    Empty,

    #[error("item {index}: invalid ts {value:?}; expected RFC 3339")]
    InvalidTimestamp { index: usize, value: String },

    #[error("item {index}: {kind} reading requires an area")]
    MissingArea { index: usize, kind: &'static str },

    #[error("item {index}: proximity reading requires a door")]
    MissingDoor { index: usize },

    #[error("item {index}: no temp, rh or prox reading present")]
    NoReading { index: usize },

    #[error("failed to save some or all of the data")]
    Persistence { errors: Vec<StorageError> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IngestError {
    /// `true` when the submission itself was at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Persistence { .. } | IngestError::Database(_))
    }
}
