//! Error types for fixture resolution and theory data generation.

use thiserror::Error;

/// Failure while a fixture builds or customizes a value.
///
/// These errors come from the generator context itself. [`AutoData`](crate::AutoData)
/// passes them through untouched, since only the fixture knows why a type
/// could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Nothing is registered for the requested type and the request carries no fallback
    #[error("no specimen builder can create {type_name}{}", describe_request(.request))]
    NoSpecimen {
        type_name: &'static str,
        request: Option<String>,
    },

    /// A builder answered a request with a value of a different type
    #[error("builder for {expected} produced a value of another type{}", describe_request(.request))]
    TypeMismatch {
        expected: &'static str,
        request: Option<String>,
    },

    /// Nested resolution went deeper than the configured limit
    #[error("recursion depth {depth} exceeded while creating {type_name}")]
    RecursionDepthExceeded { type_name: &'static str, depth: usize },

    /// A customization could not be applied
    #[error("invalid customization: {message}")]
    InvalidCustomization { message: String },

    /// A user-supplied builder reported a failure
    #[error("generation failed: {message}")]
    Generation { message: String },
}

fn describe_request(request: &Option<String>) -> String {
    match request {
        Some(name) => format!(" (request: `{}`)", name),
        None => String::new(),
    }
}

impl ResolveError {
    /// Create a generation error for custom builders
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create an invalid customization error
    pub fn invalid_customization(message: impl Into<String>) -> Self {
        Self::InvalidCustomization {
            message: message.into(),
        }
    }
}

/// Errors surfaced by theory data providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutoDataError {
    /// A required argument was absent or unusable
    #[error("invalid argument `{argument}`: {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    /// The fixture failed to customize or resolve a parameter
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A value could not be taken out of a data row
    #[error("row argument {index}: {message}")]
    RowArgument { index: usize, message: String },
}

impl AutoDataError {
    /// Create an invalid argument error
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// Whether this error came out of the fixture rather than the provider
    pub fn is_resolve_error(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}
