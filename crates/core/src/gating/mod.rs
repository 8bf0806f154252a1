//! Gating policies: when a lesson may be completed and when the scenario stage
//! may be entered. Both evaluators are side-effect free and return a check that
//! carries the reasons a transition is blocked.

mod completion;
mod unlock;

pub use completion::{
    BlockReason, CompletionBlocker, CompletionCheck, can_complete_lesson, evaluate_lesson,
};
pub use unlock::{UnlockBlocker, UnlockCheck, can_enter_scenarios, evaluate_unlock};
