//! Error taxonomy for the funnel.
//!
//! Collaborator failures (generation, search, scrape) are first-class: a
//! stage that hits one does not panic or bubble a raw transport error — it
//! converts the failure into a killed stage result carrying whatever partial
//! output it had produced. The variants here exist so call sites can tell
//! "the collaborator broke" apart from "the operator misconfigured us" and
//! "this stage is not runnable yet".

use crate::state_machine::FunnelStage;

/// External service category, used in error messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Generation,
    Search,
    Scrape,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::Search => write!(f, "search"),
            Self::Scrape => write!(f, "scrape"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FunnelError {
    /// An external service call failed (transport, HTTP status, or an
    /// unusable payload).
    #[error("{service} service error: {message}")]
    Collaborator { service: Service, message: String },

    /// The service answered but the payload had nothing usable in it.
    #[error("{service} service returned an empty response")]
    EmptyResponse { service: Service },

    /// Bad or missing configuration; nothing was attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// A stage was asked to run before the stage it reads from had output.
    #[error("{stage} requires {requires} output before it can run")]
    MissingUpstream {
        stage: FunnelStage,
        requires: FunnelStage,
    },

    /// `input` and `results` are navigation endpoints, not runnable stages.
    #[error("{0} is not an executable stage")]
    NotExecutable(FunnelStage),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FunnelError {
    /// Shorthand for the common collaborator-failure case.
    pub fn collaborator(service: Service, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }

    /// True when retrying the same call against the same service could
    /// plausibly succeed (as opposed to config or sequencing mistakes).
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Collaborator { .. } | Self::EmptyResponse { .. }
        )
    }
}
