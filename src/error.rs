/// Failures the submit and results pipelines report to their callers.
///
/// Each variant carries the identifier needed to correlate with storage
/// logs. `user_message` is the only text that reaches the end user.
#[derive(Debug, thiserror::Error)]
pub enum LpaError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Raised when no usable assessment identifier reached the assembler.
    #[error("no assessment identifier supplied")]
    NoAssessment,

    #[error("storage write failed for entry {entry_id} during {step}: {source}")]
    StorageWrite {
        entry_id: String,
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("results not found for {lookup}")]
    NotFound { lookup: Lookup },

    #[error("storage read failed for {lookup}: {source}")]
    StorageRead {
        lookup: Lookup,
        #[source]
        source: rusqlite::Error,
    },
}

/// Key a results lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Assessment(i64),
    Entry(String),
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assessment(id) => write!(f, "assessment_id={id}"),
            Self::Entry(entry_id) => write!(f, "entry_id={entry_id}"),
        }
    }
}

impl LpaError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { reason } => format!("Submission rejected: {reason}."),
            Self::NoAssessment => "No assessment specified.".to_string(),
            Self::StorageWrite { .. } => {
                "An error occurred processing your submission. Please contact support.".to_string()
            }
            Self::NotFound {
                lookup: Lookup::Assessment(id),
            } => format!("Results not found for assessment ID {id}."),
            Self::NotFound {
                lookup: Lookup::Entry(entry_id),
            } => format!("Results not found for entry {entry_id}."),
            Self::StorageRead { .. } => "Error retrieving results.".to_string(),
        }
    }
}

pub type LpaResult<T> = std::result::Result<T, LpaError>;
