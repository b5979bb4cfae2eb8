//! Oracle facade abstraction.
//!
//! The [`OracleFacade`] trait decouples the orchestrators from the concrete
//! reasoning backend. Tests use scripted facades that replay predetermined
//! replies without network access. Calls are strictly sequential: the
//! orchestrators block until one reply is fully resolved before validating it.

use serde_json::Value;

use crate::error::FacadeError;

/// A fully resolved oracle reply.
///
/// Streaming backends must consume the stream completely and hand back the
/// final content; validation never runs on partial output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacadeReply {
    Json(Value),
    Text(String),
}

impl FacadeReply {
    /// The reply as a structured object, or a [`FacadeError`] if the backend
    /// produced text where JSON was required.
    pub fn into_json(self) -> Result<Value, FacadeError> {
        match self {
            FacadeReply::Json(value) => Ok(value),
            FacadeReply::Text(_) => Err(FacadeError::ExpectedJson),
        }
    }

    /// The reply as non-empty text.
    pub fn into_text(self) -> Result<String, FacadeError> {
        match self {
            FacadeReply::Text(text) if text.trim().is_empty() => Err(FacadeError::Empty),
            FacadeReply::Text(text) => Ok(text),
            FacadeReply::Json(_) => Err(FacadeError::ExpectedText),
        }
    }
}

/// Abstraction over reasoning-oracle backends.
pub trait OracleFacade {
    /// Issue one prompt and block until the reply is fully resolved.
    fn call(&self, prompt: &str) -> Result<FacadeReply, FacadeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn into_json_rejects_text_replies() {
        assert_eq!(
            FacadeReply::Text("no".to_string()).into_json(),
            Err(FacadeError::ExpectedJson)
        );
        assert_eq!(
            FacadeReply::Json(json!({"stop": true})).into_json(),
            Ok(json!({"stop": true}))
        );
    }

    #[test]
    fn into_text_rejects_json_and_empty_replies() {
        assert_eq!(
            FacadeReply::Json(json!({})).into_text(),
            Err(FacadeError::ExpectedText)
        );
        assert_eq!(
            FacadeReply::Text("  \n".to_string()).into_text(),
            Err(FacadeError::Empty)
        );
        assert_eq!(
            FacadeReply::Text("add a step".to_string()).into_text(),
            Ok("add a step".to_string())
        );
    }
}
