use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Topic;

/// Why a fetch produced no headlines
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch headlines: {status_text}")]
    Status { status: u16, status_text: String },

    #[error("{0}")]
    Application(String),

    #[error("Invalid or missing data: {0}")]
    InvalidPayload(String),

    #[error("Failed to fetch headlines: {0}")]
    Network(#[from] reqwest::Error),
}

/// Rejected edits to the form or the displayed result
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is in the future; pick today or an earlier date")]
    FutureDate(NaiveDate),

    #[error("Not a date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Not a whole number: {0}")]
    InvalidCount(String),

    #[error("Unknown topic: {0}. Use 'ai', 'senior', or 'forsale'")]
    UnknownTopic(String),

    #[error("No headline #{}; the list has {len}", .index + 1)]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A request is still outstanding")]
    Busy,

    #[error("{0} has no server-supplied markup")]
    NoServerFragment(Topic),
}
