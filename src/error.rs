use thiserror::Error;

use crate::lang::{get_string, get_string_with};

/// Failures that end a view request with an error page.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{}", get_string("errornoid"))]
    NoId,

    #[error("{}", get_string_with("invalidrecord", .table))]
    MissingRecord { table: &'static str },

    #[error("{}", get_string("requireloginerror"))]
    RequireLogin,

    #[error("{}", get_string("mustenablecompletionavailability"))]
    CompletionAvailabilityDisabled,

    #[error("{}", get_string("errorreengagementnotvalid"))]
    NotValid,

    #[error("{}", get_string_with("invalidschedule", .field))]
    InvalidSchedule { field: &'static str },

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error(transparent)]
    StoreWrite(anyhow::Error),
}

impl ViewError {
    /// String key shown alongside the message on the error page.
    pub fn key(&self) -> &'static str {
        match self {
            Self::NoId => "errornoid",
            Self::MissingRecord { .. } => "invalidrecord",
            Self::RequireLogin => "requireloginerror",
            Self::CompletionAvailabilityDisabled => "mustenablecompletionavailability",
            Self::NotValid => "errorreengagementnotvalid",
            Self::InvalidSchedule { .. } => "invalidschedule",
            Self::Store(_) => "dmlreadexception",
            Self::StoreWrite(_) => "dmlwriteexception",
        }
    }
}
