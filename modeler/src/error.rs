//! Error taxonomy for the modeling core.
//!
//! Recoverable kinds ([`SchemaError`], [`StructuralError`], [`FacadeError`])
//! become feedback text on the next oracle prompt; [`ModelerError`] is what
//! escapes to callers once a retry budget is exhausted.

use thiserror::Error;

/// A process tree or edit proposal violates the element/operation grammar.
///
/// The message is stable and names the offending element and rule; it is fed
/// back to the oracle verbatim on the next prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An edit operation references a nonexistent id or an illegal move.
///
/// Raised by the edit function library; the tree is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StructuralError(pub String);

impl StructuralError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The oracle facade failed or returned unusable content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacadeError {
    #[error("oracle call failed: {0}")]
    Call(String),
    #[error("oracle returned empty output")]
    Empty,
    #[error("oracle returned malformed JSON: {0}")]
    Malformed(String),
    #[error("expected a JSON object from the oracle, got text")]
    ExpectedJson,
    #[error("expected text from the oracle, got a JSON object")]
    ExpectedText,
}

/// Which bounded retry layer was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// Whole-tree generation attempts in the creation loop.
    Generation,
    /// Proposal grammar attempts for a single proposal request.
    ProposalGrammar,
    /// Structural apply attempts for a single accepted proposal.
    StructuralApply,
    /// Intermediate edit rounds without a stop signal.
    EditRounds,
}

impl RetryBudget {
    pub fn as_str(self) -> &'static str {
        match self {
            RetryBudget::Generation => "generation",
            RetryBudget::ProposalGrammar => "proposal grammar",
            RetryBudget::StructuralApply => "structural apply",
            RetryBudget::EditRounds => "edit rounds",
        }
    }
}

impl std::fmt::Display for RetryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error surfaced by the orchestrators.
///
/// The recoverable variants only escape when they occur outside a retry loop
/// (e.g. a facade failure while resolving the change request).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelerError {
    #[error("{budget} budget exhausted after {attempts} attempts")]
    RetryBudgetExceeded { budget: RetryBudget, attempts: u32 },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Facade(#[from] FacadeError),
}

/// Invalid or unreadable orchestration config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{0}")]
    Invalid(String),
}
