//! Test-only helpers: deterministic element builders and a scripted facade.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::FacadeError;
use crate::io::facade::{FacadeReply, OracleFacade};
use crate::process::{ElementKind, ExclusiveBranch, ProcessElement};

/// Create a task with a deterministic label derived from its id.
pub fn task(id: &str) -> ProcessElement {
    labeled_task(id, &format!("{id} label"))
}

/// Create a task with an explicit label.
pub fn labeled_task(id: &str, label: &str) -> ProcessElement {
    ProcessElement {
        id: id.to_string(),
        kind: ElementKind::Task {
            label: label.to_string(),
        },
    }
}

/// Create an exclusive gateway with the given branches.
pub fn exclusive(id: &str, branches: Vec<ExclusiveBranch>) -> ProcessElement {
    ProcessElement {
        id: id.to_string(),
        kind: ElementKind::ExclusiveGateway {
            label: format!("{id} label"),
            branches,
        },
    }
}

/// Create one conditional branch without a continuation override.
pub fn branch(condition: &str, path: Vec<ProcessElement>) -> ExclusiveBranch {
    ExclusiveBranch {
        condition: condition.to_string(),
        path,
        next: None,
    }
}

/// Create a parallel gateway with the given branch bodies.
pub fn parallel(id: &str, branches: Vec<Vec<ProcessElement>>) -> ProcessElement {
    ProcessElement {
        id: id.to_string(),
        kind: ElementKind::ParallelGateway { branches },
    }
}

/// Scripted oracle facade replaying queued replies and recording prompts.
///
/// Once the queue is drained, further calls return [`FacadeError::Empty`], so
/// a test that miscounts calls fails loudly instead of hanging.
pub struct ScriptedFacade {
    replies: RefCell<VecDeque<Result<FacadeReply, FacadeError>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedFacade {
    pub fn new(replies: Vec<Result<FacadeReply, FacadeError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// The prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// How many calls the facade has served.
    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    /// How many scripted replies are still queued.
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl OracleFacade for ScriptedFacade {
    fn call(&self, prompt: &str) -> Result<FacadeReply, FacadeError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(FacadeError::Empty))
    }
}
