use thiserror::Error;

use crate::task::Field;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} required", describe_missing(.0))]
    Missing(Vec<Field>),

    #[error("deadline {0:?} is not a valid date")]
    InvalidDeadline(String),
}

fn describe_missing(fields: &[Field]) -> String {
    let labels: Vec<&str> = fields.iter().map(|field| field.label()).collect();
    match labels.as_slice() {
        [] => "nothing is".to_string(),
        [one] => format!("{one} is"),
        [init @ .., last] => format!("{} and {last} are", init.join(", ")),
    }
}

/// Everything a `TaskStore` operation can report. None of these end the session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to load tasks from {key}: {reason}")]
    StorageRead { key: String, reason: String },

    #[error("failed to save tasks to {key}: {reason}; the latest change may not survive a reload")]
    StorageWrite { key: String, reason: String },

    #[error("could not generate a unique task id after {attempts} attempts")]
    IdCollision { attempts: usize },
}

impl StoreError {
    pub(crate) fn read(key: &str, err: impl std::fmt::Display) -> Self {
        StoreError::StorageRead {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn write(key: &str, err: &anyhow::Error) -> Self {
        StoreError::StorageWrite {
            key: key.to_string(),
            reason: format!("{err:#}"),
        }
    }
}
