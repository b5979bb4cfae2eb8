//! Prompt rendering for oracle calls.
//!
//! Templates are compiled once per renderer from files embedded at build
//! time; substitution values are the process as pretty-printed JSON, the
//! change request, and the rendered message history.

use minijinja::{Environment, context};

use crate::core::types::{MessageItem, history_to_text};
use crate::process::{ProcessElement, process_to_text};

const CREATE_PROCESS_TEMPLATE: &str = include_str!("prompts/create_process.md");
const EDIT_PROCESS_TEMPLATE: &str = include_str!("prompts/edit_process.md");
const EDIT_INTERMEDIATE_TEMPLATE: &str = include_str!("prompts/edit_process_intermediate.md");
const CHANGE_REQUEST_TEMPLATE: &str = include_str!("prompts/define_change_request.md");

/// Template engine wrapper around minijinja.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("create_process", CREATE_PROCESS_TEMPLATE)
            .expect("create_process template should be valid");
        env.add_template("edit_process", EDIT_PROCESS_TEMPLATE)
            .expect("edit_process template should be valid");
        env.add_template("edit_process_intermediate", EDIT_INTERMEDIATE_TEMPLATE)
            .expect("edit_process_intermediate template should be valid");
        env.add_template("define_change_request", CHANGE_REQUEST_TEMPLATE)
            .expect("define_change_request template should be valid");
        Self { env }
    }

    /// Prompt for generating a brand-new process from the conversation.
    pub fn create_process(&self, message_history: &[MessageItem]) -> String {
        self.render(
            "create_process",
            context! {
                message_history => history_to_text(message_history),
            },
        )
    }

    /// Prompt for the initial edit proposal.
    pub fn edit_process(&self, process: &[ProcessElement], change_request: &str) -> String {
        self.render(
            "edit_process",
            context! {
                process => process_to_text(process),
                change_request => change_request,
            },
        )
    }

    /// Prompt for each intermediate edit proposal, seeded with the current
    /// (already edited) tree.
    pub fn edit_process_intermediate(&self, process: &[ProcessElement]) -> String {
        self.render(
            "edit_process_intermediate",
            context! {
                process => process_to_text(process),
            },
        )
    }

    /// Prompt for distilling the conversation into one change request.
    pub fn define_change_request(
        &self,
        process: &[ProcessElement],
        message_history: &[MessageItem],
    ) -> String {
        self.render(
            "define_change_request",
            context! {
                process => process_to_text(process),
                message_history => history_to_text(message_history),
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> String {
        let template = self
            .env
            .get_template(name)
            .expect("templates are registered at construction");
        template
            .render(ctx)
            .expect("prompt template rendering should not fail")
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::task;

    #[test]
    fn create_prompt_includes_the_conversation() {
        let renderer = PromptRenderer::new();
        let history = vec![MessageItem::user("Model an order process")];
        let prompt = renderer.create_process(&history);
        assert!(prompt.contains("user: Model an order process"));
        assert!(prompt.contains("\"process\""));
    }

    #[test]
    fn edit_prompt_includes_process_and_change_request() {
        let renderer = PromptRenderer::new();
        let process = vec![task("a")];
        let prompt = renderer.edit_process(&process, "Remove the approval step");
        assert!(prompt.contains("\"id\": \"a\""));
        assert!(prompt.contains("Remove the approval step"));
        assert!(prompt.contains("delete_element"));
    }

    #[test]
    fn intermediate_prompt_offers_the_stop_marker() {
        let renderer = PromptRenderer::new();
        let prompt = renderer.edit_process_intermediate(&[task("a")]);
        assert!(prompt.contains("{\"stop\": true}"));
        assert!(prompt.contains("\"id\": \"a\""));
    }

    #[test]
    fn change_request_prompt_asks_for_text() {
        let renderer = PromptRenderer::new();
        let prompt = renderer.define_change_request(&[task("a")], &[MessageItem::user("hi")]);
        assert!(prompt.contains("no JSON"));
        assert!(prompt.contains("user: hi"));
    }
}
