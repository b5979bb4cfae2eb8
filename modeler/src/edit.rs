//! Iterative process editing driven by oracle proposals.
//!
//! The session is a finite state machine: one initial edit, then up to
//! `max_rounds` intermediate rounds, each round fetching a proposal against
//! the current tree. Two retry layers are bounded independently: proposal
//! grammar (cheap local checks before touching the tree) and structural apply
//! (the proposal parsed but referenced the tree incorrectly). Every
//! recoverable failure becomes feedback text on the next prompt; every budget
//! is a hard ceiling, so total facade calls are bounded regardless of oracle
//! behavior.

use tracing::{debug, info, warn};

use crate::core::edits::apply_operation;
use crate::core::proposal::{EditOperation, EditProposal, parse_proposal};
use crate::core::types::MessageItem;
use crate::error::{ModelerError, RetryBudget};
use crate::io::facade::OracleFacade;
use crate::io::prompt::PromptRenderer;
use crate::process::{Process, ProcessElement};

/// Budgets for the edit loop. Every layer is a hard ceiling.
#[derive(Debug, Clone)]
pub struct EditConfig {
    /// Attempts to obtain a grammar-valid proposal per request.
    pub proposal_max_retries: u32,
    /// Attempts to structurally apply one accepted proposal.
    pub apply_max_retries: u32,
    /// Intermediate edit rounds before giving up without a stop signal.
    pub max_rounds: u32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            proposal_max_retries: 3,
            apply_max_retries: 3,
            max_rounds: 7,
        }
    }
}

/// Edit a process based on the conversation history.
///
/// Resolves the concrete change request via the oracle first, then runs a
/// [`ProcessEditor`] session over the tree.
pub fn edit_bpmn<F: OracleFacade>(
    facade: &F,
    process: Process,
    message_history: &[MessageItem],
    config: &EditConfig,
) -> Result<Process, ModelerError> {
    let change_request = define_change_request(facade, &process, message_history)?;
    info!(change_request = %change_request, "change request resolved");
    ProcessEditor::new(facade, change_request, config.clone()).run(process)
}

/// Ask the oracle to distill the message history into one change request.
pub fn define_change_request<F: OracleFacade>(
    facade: &F,
    process: &[ProcessElement],
    message_history: &[MessageItem],
) -> Result<String, ModelerError> {
    let renderer = PromptRenderer::new();
    let prompt = renderer.define_change_request(process, message_history);
    let text = facade.call(&prompt)?.into_text()?;
    Ok(text.trim().to_string())
}

/// Drives one edit session: an initial edit plus bounded intermediate rounds.
pub struct ProcessEditor<'a, F> {
    facade: &'a F,
    renderer: PromptRenderer,
    change_request: String,
    config: EditConfig,
}

impl<'a, F: OracleFacade> ProcessEditor<'a, F> {
    pub fn new(facade: &'a F, change_request: impl Into<String>, config: EditConfig) -> Self {
        Self {
            facade,
            renderer: PromptRenderer::new(),
            change_request: change_request.into(),
            config,
        }
    }

    /// Run the full edit session against `process`, returning the edited tree.
    pub fn run(&self, process: Process) -> Result<Process, ModelerError> {
        let edited = self.initial_edit(&process)?;
        self.intermediate_edits(edited)
    }

    /// The initial edit: a stop marker is not an acceptable first proposal.
    fn initial_edit(&self, process: &Process) -> Result<Process, ModelerError> {
        let prompt = self.renderer.edit_process(process, &self.change_request);
        match self.request_proposal(&prompt, false)? {
            EditProposal::Edit(operation) => self.apply_with_retries(process, operation),
            EditProposal::Stop => Ok(process.clone()),
        }
    }

    /// Up to `max_rounds` further proposals against the current tree; only a
    /// stop marker ends the session successfully.
    fn intermediate_edits(&self, mut process: Process) -> Result<Process, ModelerError> {
        for round in 1..=self.config.max_rounds {
            let prompt = self.renderer.edit_process_intermediate(&process);
            match self.request_proposal(&prompt, true)? {
                EditProposal::Stop => {
                    info!(round, "edit session stopped");
                    return Ok(process);
                }
                EditProposal::Edit(operation) => {
                    debug!(round, verb = operation.verb(), "intermediate proposal accepted");
                    process = self.apply_with_retries(&process, operation)?;
                }
            }
        }
        Err(ModelerError::RetryBudgetExceeded {
            budget: RetryBudget::EditRounds,
            attempts: self.config.max_rounds,
        })
    }

    /// Request a proposal, re-prompting with error feedback until it parses
    /// or the grammar budget is exhausted.
    fn request_proposal(
        &self,
        initial_prompt: &str,
        accept_stop: bool,
    ) -> Result<EditProposal, ModelerError> {
        let mut prompt = initial_prompt.to_string();
        let mut attempts = 0u32;
        while attempts < self.config.proposal_max_retries {
            attempts += 1;
            match self.fetch_proposal(&prompt, accept_stop) {
                Ok(proposal) => return Ok(proposal),
                Err(message) => {
                    warn!(attempts, error = %message, "invalid edit proposal");
                    prompt = format!("Editing error: {message}. Provide a new edit proposal.");
                }
            }
        }
        Err(ModelerError::RetryBudgetExceeded {
            budget: RetryBudget::ProposalGrammar,
            attempts,
        })
    }

    /// Apply one operation, requesting replacement proposals on failure.
    ///
    /// A failed apply, an invalid replacement proposal, and a facade error all
    /// consume one apply attempt. A stop fetched mid-retry ends the step,
    /// handing back the unedited input tree.
    fn apply_with_retries(
        &self,
        process: &Process,
        operation: EditOperation,
    ) -> Result<Process, ModelerError> {
        let mut pending = Some(operation);
        let mut feedback = String::new();
        let mut attempts = 0u32;
        while attempts < self.config.apply_max_retries {
            attempts += 1;
            if let Some(operation) = pending.take() {
                match apply_operation(process, &operation) {
                    Ok(next) => {
                        info!(attempts, verb = operation.verb(), "edit applied");
                        return Ok(next);
                    }
                    Err(err) => {
                        warn!(attempts, error = %err, "structural apply failed");
                        feedback = err.to_string();
                    }
                }
            }
            if attempts >= self.config.apply_max_retries {
                break;
            }
            let prompt = format!(
                "Error: {feedback}. Try again. Change request: {}",
                self.change_request
            );
            match self.fetch_proposal(&prompt, true) {
                Ok(EditProposal::Stop) => {
                    info!("stop received while retrying; keeping the current tree");
                    return Ok(process.clone());
                }
                Ok(EditProposal::Edit(operation)) => pending = Some(operation),
                Err(message) => {
                    warn!(attempts, error = %message, "replacement proposal invalid");
                    feedback = message;
                }
            }
        }
        Err(ModelerError::RetryBudgetExceeded {
            budget: RetryBudget::StructuralApply,
            attempts,
        })
    }

    /// One facade round-trip plus grammar validation, folded into a single
    /// feedback message on failure.
    fn fetch_proposal(&self, prompt: &str, accept_stop: bool) -> Result<EditProposal, String> {
        let reply = self.facade.call(prompt).map_err(|err| err.to_string())?;
        let value = reply.into_json().map_err(|err| err.to_string())?;
        parse_proposal(&value, accept_stop).map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FacadeError;
    use crate::io::facade::FacadeReply;
    use crate::test_support::{ScriptedFacade, task};
    use serde_json::{Value, json};

    fn json_reply(value: Value) -> Result<FacadeReply, FacadeError> {
        Ok(FacadeReply::Json(value))
    }

    fn delete(id: &str) -> Value {
        json!({"function": "delete_element", "arguments": {"element_id": id}})
    }

    fn stop() -> Value {
        json!({"stop": true})
    }

    fn editor<'a>(facade: &'a ScriptedFacade) -> ProcessEditor<'a, ScriptedFacade> {
        ProcessEditor::new(facade, "Remove task b", EditConfig::default())
    }

    fn ids(process: &[ProcessElement]) -> Vec<&str> {
        process.iter().map(|element| element.id.as_str()).collect()
    }

    #[test]
    fn initial_edit_then_stop_returns_the_edited_tree() {
        let facade = ScriptedFacade::new(vec![json_reply(delete("b")), json_reply(stop())]);
        let process = vec![task("a"), task("b"), task("c")];
        let result = editor(&facade).run(process).expect("edit");
        assert_eq!(ids(&result), vec!["a", "c"]);
        assert_eq!(facade.calls(), 2);
        // The intermediate prompt is seeded with the already-edited tree.
        assert!(!facade.prompts()[1].contains("\"id\": \"b\""));
    }

    #[test]
    fn stop_is_rejected_as_the_first_proposal() {
        let facade = ScriptedFacade::new(vec![
            json_reply(stop()),
            json_reply(delete("b")),
            json_reply(stop()),
        ]);
        let process = vec![task("a"), task("b")];
        let result = editor(&facade).run(process).expect("edit");
        assert_eq!(ids(&result), vec!["a"]);
        assert!(facade.prompts()[1].contains("not a valid first proposal"));
    }

    /// A facade that only ever returns grammatically invalid proposals
    /// exhausts the proposal grammar budget after exactly 3 attempts.
    #[test]
    fn grammar_budget_is_exhausted_after_exactly_three_attempts() {
        let invalid = json!({"function": "explode", "arguments": {}});
        let facade = ScriptedFacade::new(vec![
            json_reply(invalid.clone()),
            json_reply(invalid.clone()),
            json_reply(invalid),
        ]);
        let err = editor(&facade)
            .run(vec![task("a")])
            .expect_err("should fail");
        assert_eq!(
            err,
            ModelerError::RetryBudgetExceeded {
                budget: RetryBudget::ProposalGrammar,
                attempts: 3,
            }
        );
        assert_eq!(facade.calls(), 3);
        assert_eq!(facade.remaining(), 0);
        assert!(facade.prompts()[1].starts_with("Editing error: "));
        assert!(facade.prompts()[1].contains("unknown edit function 'explode'"));
    }

    /// A facade that only ever returns structurally invalid proposals
    /// exhausts the apply budget after exactly 3 apply attempts.
    #[test]
    fn apply_budget_is_exhausted_after_exactly_three_attempts() {
        let facade = ScriptedFacade::new(vec![
            json_reply(delete("zz")),
            json_reply(delete("zz")),
            json_reply(delete("zz")),
        ]);
        let err = editor(&facade)
            .run(vec![task("a")])
            .expect_err("should fail");
        assert_eq!(
            err,
            ModelerError::RetryBudgetExceeded {
                budget: RetryBudget::StructuralApply,
                attempts: 3,
            }
        );
        assert_eq!(facade.calls(), 3);
        assert_eq!(facade.remaining(), 0);
        let retry_prompt = &facade.prompts()[1];
        assert!(retry_prompt.contains("'zz' does not exist"));
        assert!(retry_prompt.contains("Change request: Remove task b"));
    }

    /// A stop proposal fetched during apply retries short-circuits to the
    /// pre-edit tree, and the session continues into intermediate rounds.
    #[test]
    fn stop_during_apply_retries_keeps_the_pre_edit_tree() {
        let facade = ScriptedFacade::new(vec![
            json_reply(delete("zz")),
            json_reply(stop()),
            json_reply(stop()),
        ]);
        let process = vec![task("a"), task("b")];
        let result = editor(&facade).run(process.clone()).expect("edit");
        assert_eq!(result, process);
        assert_eq!(facade.calls(), 3);
    }

    #[test]
    fn facade_errors_consume_proposal_attempts() {
        let facade = ScriptedFacade::new(vec![
            Err(FacadeError::Call("timeout".to_string())),
            json_reply(delete("b")),
            json_reply(stop()),
        ]);
        let result = editor(&facade)
            .run(vec![task("a"), task("b")])
            .expect("edit");
        assert_eq!(ids(&result), vec!["a"]);
        assert!(facade.prompts()[1].contains("timeout"));
    }

    #[test]
    fn invalid_intermediate_proposals_are_retried_with_feedback() {
        let facade = ScriptedFacade::new(vec![
            json_reply(delete("b")),
            json_reply(json!({"function": "delete_element", "arguments": {}})),
            json_reply(stop()),
        ]);
        let result = editor(&facade)
            .run(vec![task("a"), task("b")])
            .expect("edit");
        assert_eq!(ids(&result), vec!["a"]);
        assert!(
            facade.prompts()[2].contains("'delete_element' arguments must contain 'element_id'")
        );
    }

    /// Completing all intermediate rounds without a stop signal is terminal.
    #[test]
    fn seven_rounds_without_stop_exhaust_the_round_budget() {
        let rename = json!({"function": "update_element", "arguments": {
            "new_element": {"id": "a", "type": "task", "label": "Renamed"}
        }});
        let mut replies = vec![json_reply(delete("b"))];
        for _ in 0..7 {
            replies.push(json_reply(rename.clone()));
        }
        let facade = ScriptedFacade::new(replies);
        let err = editor(&facade)
            .run(vec![task("a"), task("b")])
            .expect_err("should fail");
        assert_eq!(
            err,
            ModelerError::RetryBudgetExceeded {
                budget: RetryBudget::EditRounds,
                attempts: 7,
            }
        );
        assert_eq!(facade.calls(), 8);
        assert_eq!(facade.remaining(), 0);
    }

    #[test]
    fn edit_bpmn_resolves_the_change_request_first() {
        let facade = ScriptedFacade::new(vec![
            Ok(FacadeReply::Text("Remove task b\n".to_string())),
            json_reply(delete("b")),
            json_reply(stop()),
        ]);
        let history = vec![MessageItem::user("Please drop the second step")];
        let result = edit_bpmn(
            &facade,
            vec![task("a"), task("b")],
            &history,
            &EditConfig::default(),
        )
        .expect("edit");
        assert_eq!(ids(&result), vec!["a"]);
        assert!(facade.prompts()[0].contains("user: Please drop the second step"));
        assert!(facade.prompts()[1].contains("Remove task b"));
    }

    #[test]
    fn edit_bpmn_propagates_change_request_facade_failures() {
        let facade = ScriptedFacade::new(vec![Ok(FacadeReply::Json(json!({})))]);
        let err = edit_bpmn(&facade, vec![task("a")], &[], &EditConfig::default())
            .expect_err("should fail");
        assert_eq!(err, ModelerError::Facade(FacadeError::ExpectedText));
    }
}
