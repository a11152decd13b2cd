use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("unique constraint violated on table `{table}`")]
    Conflict { table: String },
    #[error("remote store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed row in `{table}`: {reason}")]
    Decode { table: String, reason: String },
    #[error("invalid login credentials")]
    InvalidCredentials,
}

impl StoreError {
    pub fn decode(table: impl ToString, reason: impl ToString) -> Self {
        Self::Decode {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Failures worth another attempt: the request may succeed unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Rejected {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}
