//! One-shot process creation with bounded validation retries.

use tracing::{debug, info, warn};

use crate::core::types::MessageItem;
use crate::core::validator::{parse_process, validate_process};
use crate::error::{ModelerError, RetryBudget, SchemaError};
use crate::io::facade::OracleFacade;
use crate::io::prompt::PromptRenderer;
use crate::process::{Process, process_to_text};

/// Budgets for the creation loop.
#[derive(Debug, Clone)]
pub struct CreationConfig {
    /// Whole-tree generation attempts before giving up.
    pub max_retries: u32,
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Generate a brand-new process from the conversation history.
///
/// Each attempt regenerates the whole tree; there is no partial recovery.
/// Validator and facade errors become feedback on the follow-up prompt so the
/// oracle can self-correct, up to `config.max_retries` attempts.
pub fn create_bpmn<F: OracleFacade>(
    facade: &F,
    message_history: &[MessageItem],
    config: &CreationConfig,
) -> Result<Process, ModelerError> {
    let renderer = PromptRenderer::new();
    let mut prompt = renderer.create_process(message_history);

    let mut attempts = 0u32;
    while attempts < config.max_retries {
        attempts += 1;
        match attempt_create(facade, &prompt) {
            Ok(process) => {
                info!(attempts, elements = process.len(), "process created");
                debug!(process = %process_to_text(&process), "generated process");
                return Ok(process);
            }
            Err(err) => {
                warn!(attempts, error = %err, "process generation attempt failed");
                prompt = format!("Error: {err}. Try again.");
            }
        }
    }

    Err(ModelerError::RetryBudgetExceeded {
        budget: RetryBudget::Generation,
        attempts,
    })
}

fn attempt_create<F: OracleFacade>(facade: &F, prompt: &str) -> Result<Process, ModelerError> {
    let reply = facade.call(prompt)?;
    let value = reply.into_json()?;
    let process = value
        .get("process")
        .ok_or_else(|| SchemaError::new("response is missing the 'process' key"))?;
    validate_process(process)?;
    Ok(parse_process(process)?)
}
