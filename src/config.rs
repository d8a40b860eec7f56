//! Batch configuration and failure-tolerance policy.

/// Tolerance applied while parsing a changeset response.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Unresolvable sub-responses are protocol errors.
    #[default]
    Abort,
    /// Ask the service to continue past failed changeset members
    /// (`Prefer: odata.continue-on-error`) and tolerate unresolvable
    /// sub-responses during parsing.
    Continue,
}

impl ErrorPolicy {
    /// Whether an unresolvable changeset sub-response is tolerated.
    #[must_use]
    pub fn tolerates_unresolved(self) -> bool { matches!(self, Self::Continue) }
}

/// Limits and policy for one batch call.
#[derive(Clone, Copy, Debug)]
pub struct BatchConfig {
    /// Capacity of the in-memory pipe between the builder and the
    /// transport task. The builder blocks once this fills.
    pub pipe_capacity: usize,
    /// Maximum accepted length of a single response line.
    pub max_line_length: usize,
    /// Maximum accepted header count per response part.
    pub max_part_headers: usize,
    /// Failure-tolerance policy for changesets.
    pub policy: ErrorPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pipe_capacity: 64 * 1024,
            max_line_length: 8 * 1024,
            max_part_headers: 64,
            policy: ErrorPolicy::Abort,
        }
    }
}
