//! Form State — the in-memory draft behind the single submission screen.
//!
//! Owned by whoever drives the screen and mutated only through the named
//! operations below. Nothing here is persisted.

use tracing::{debug, info};

use crate::encoder::FileEncoder;
use crate::errors::{SubmitError, ValidationError};
use crate::picker::{FileSelector, PickError, SelectedFile, ALLOWED_MIME_TYPES};
use crate::session::SessionId;
use crate::submission::{ResumeAttachment, SubmissionPayload, SubmissionTransport};

#[derive(Debug, Default)]
pub struct FormState {
    resume: Option<SelectedFile>,
    keywords: String,
    instructions: String,
    submitting: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(&self) -> Option<&SelectedFile> {
        self.resume.as_ref()
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// While `true` the submit affordance should be disabled.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Replaces any previous selection.
    pub fn set_resume(&mut self, file: SelectedFile) {
        self.resume = Some(file);
    }

    pub fn clear_resume(&mut self) {
        self.resume = None;
    }

    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.keywords = keywords.into();
    }

    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = instructions.into();
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    fn reset(&mut self) {
        self.clear_resume();
        self.keywords.clear();
        self.instructions.clear();
    }

    /// Resume first, then keywords. Instructions are optional.
    pub fn validate(&self) -> Result<&SelectedFile, ValidationError> {
        let resume = self.resume.as_ref().ok_or(ValidationError::ResumeRequired)?;
        if self.keywords.trim().is_empty() {
            return Err(ValidationError::KeywordsRequired);
        }
        Ok(resume)
    }

    /// Runs the selector with the resume allow-list.
    /// Returns `Ok(true)` when a file was selected; a cancel or an error leaves the
    /// current selection untouched.
    pub async fn pick_resume(&mut self, selector: &dyn FileSelector) -> Result<bool, PickError> {
        match selector.pick_document(ALLOWED_MIME_TYPES).await? {
            Some(file) => {
                self.set_resume(file);
                Ok(true)
            }
            None => {
                debug!("Document pick cancelled");
                Ok(false)
            }
        }
    }

    /// Validates and assembles a fresh payload, reading the resume bytes now.
    pub async fn build_payload(
        &self,
        session_id: &SessionId,
        encoder: &dyn FileEncoder,
    ) -> Result<SubmissionPayload, SubmitError> {
        let resume = self.validate()?;
        let data = encoder.encode(&resume.location).await?;

        Ok(SubmissionPayload {
            session_id: session_id.clone(),
            resume: ResumeAttachment {
                name: resume.name.clone(),
                size: resume.size,
                mime_type: resume.mime_type.clone(),
                data,
            },
            keywords: self.keywords.trim().to_string(),
            instructions: self.instructions.trim().to_string(),
        })
    }

    /// One user-initiated submit.
    ///
    /// - validation failures return before `submitting` is touched
    /// - `submitting` is `true` from encode through the HTTP round trip, `false` on every exit
    /// - success clears the resume, keywords and instructions; any error keeps them
    pub async fn submit(
        &mut self,
        session_id: &SessionId,
        encoder: &dyn FileEncoder,
        transport: &dyn SubmissionTransport,
    ) -> Result<(), SubmitError> {
        if self.submitting {
            return Err(SubmitError::AlreadySubmitting);
        }
        self.validate()?;

        self.set_submitting(true);
        let result = match self.build_payload(session_id, encoder).await {
            Ok(payload) => transport.submit(&payload).await,
            Err(e) => Err(e),
        };
        self.set_submitting(false);

        if result.is_ok() {
            info!("Submission accepted; resetting form");
            self.reset();
        }
        result
    }
}
