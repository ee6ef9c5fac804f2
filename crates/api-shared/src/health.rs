use crate::types::MessageRes;

/// Simple health service for liveness checks
///
/// Provides a standardised answer to "is the submission service up?".
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `MessageRes` indicating the service is healthy.
    pub fn check_health() -> MessageRes {
        MessageRes::ok("Submission service is alive")
    }
}
