//! Last-step signing before a card leaves the process.

use cardkit_core::RawSignedModel;

/// What a sign hook fails with. The manager reports it as
/// [`CardError::SignHook`](crate::CardError::SignHook).
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Runs once on every outgoing model, right before it is submitted.
///
/// Typically appends a signature whose key lives somewhere the card manager
/// cannot see. An error aborts the submission.
pub trait SignHook: Send + Sync {
    fn apply(&self, model: RawSignedModel) -> Result<RawSignedModel, HookError>;
}

impl<F> SignHook for F
where
    F: Fn(RawSignedModel) -> Result<RawSignedModel, HookError> + Send + Sync,
{
    fn apply(&self, model: RawSignedModel) -> Result<RawSignedModel, HookError> {
        self(model)
    }
}
