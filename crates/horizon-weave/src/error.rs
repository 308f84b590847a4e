//! Error types for list composition.

use crate::compose::{ProviderId, ViewType};

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors that can occur while composing providers into one list.
///
/// [`ViewTypeConflict`](Self::ViewTypeConflict) and
/// [`ProviderContract`](Self::ProviderContract) indicate a programming error
/// in one of the providers and are never recovered from internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    /// Two live providers present the same view type.
    #[error("view type {view_type} is owned by provider {existing:?} and cannot be used by {requested:?}")]
    ViewTypeConflict {
        view_type: ViewType,
        existing: ProviderId,
        requested: ProviderId,
    },

    /// A provider broke its contract at runtime.
    #[error("provider '{provider}' broke its contract: {reason}")]
    ProviderContract { provider: String, reason: String },

    /// No live provider owns the view type.
    #[error("no registered provider owns view type {0}")]
    UnknownViewType(ViewType),

    /// The provider instance is already registered.
    #[error("provider is already registered as {0:?}")]
    AlreadyRegistered(ProviderId),

    /// The registration id is not (or no longer) present.
    #[error("provider {0:?} is not registered")]
    UnknownProvider(ProviderId),

    /// A flattened position past the end of the list.
    #[error("position {position} is out of range for a list of {len} rows")]
    PositionOutOfRange { position: usize, len: usize },

    /// Configuration could not be parsed or serialized.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ComposeError {
    /// Create a contract violation error.
    pub fn contract(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderContract {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(position: usize, len: usize) -> Self {
        Self::PositionOutOfRange { position, len }
    }

    /// Returns `true` for errors that signal a broken provider rather than a
    /// bad call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ViewTypeConflict { .. } | Self::ProviderContract { .. }
        )
    }
}

impl From<toml::de::Error> for ComposeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ComposeError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}
