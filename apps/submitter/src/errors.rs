use thiserror::Error;

use crate::encoder::ReadError;
use crate::picker::PickError;

/// Input problems the user has to fix before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("resume required")]
    ResumeRequired,

    #[error("keywords required")]
    KeywordsRequired,
}

/// Every way a single submit attempt can end without success.
/// None of these are retried; the form keeps its data so the user can resubmit.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {status} - {body}")]
    Server { status: u16, body: String },

    #[error("A submission is already in progress")]
    AlreadySubmitting,
}

/// A blocking, modal-style message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub message: String,
}

impl Notice {
    pub fn success() -> Self {
        Notice {
            title: "Success",
            message: "Your resume and information have been submitted successfully!".to_string(),
        }
    }
}

impl SubmitError {
    /// Maps the error onto the notice the user sees. Non-validation failures are logged here.
    pub fn notice(&self) -> Notice {
        match self {
            SubmitError::Validation(ValidationError::ResumeRequired) => Notice {
                title: "Validation Error",
                message: "Please upload your resume.".to_string(),
            },
            SubmitError::Validation(ValidationError::KeywordsRequired) => Notice {
                title: "Validation Error",
                message: "Please add desired keywords.".to_string(),
            },
            SubmitError::AlreadySubmitting => Notice {
                title: "Submission Error",
                message: "A submission is already in progress. Please wait.".to_string(),
            },
            SubmitError::Read(e) => {
                tracing::error!("Resume read error: {e}");
                failed_to_submit(&e.to_string())
            }
            SubmitError::Network(cause) => {
                tracing::error!("Network error: {cause}");
                failed_to_submit(cause)
            }
            SubmitError::Server { status, body } => {
                tracing::error!("Server error: {status} - {body}");
                failed_to_submit(&format!("Server error: {status} - {body}"))
            }
        }
    }
}

impl PickError {
    pub fn notice(&self) -> Notice {
        tracing::error!("Error picking document: {self}");
        Notice {
            title: "Error",
            message: "Failed to pick document. Please try again.".to_string(),
        }
    }
}

fn failed_to_submit(detail: &str) -> Notice {
    Notice {
        title: "Submission Error",
        message: format!("Failed to submit: {detail}. Please try again."),
    }
}
