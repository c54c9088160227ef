//! Conversation State Machine
//!
//! Each product is a [`ProductFlow`]: an ordered step table whose steps carry
//! the fields collected so far. [`QuoteEngine`] runs them all from one loop and
//! handles the commands, the root menu and the export question.

pub mod borrower;
pub mod burial;
pub mod commands;
pub mod education;
pub mod endowment;
pub mod engine;
pub mod messages;
pub mod sessions;
pub mod states;

pub use commands::{normalize_command, ConversationCommand, MenuChoice};
pub use engine::{
    step_order, FlowContext, ProductFlow, QuoteEngine, StepOutcome, TerminationReason, TurnOutput,
    TurnTransition,
};
pub use sessions::SessionStore;
pub use states::{
    BorrowerStep, BurialStep, EducationStep, EndowmentStep, Session, SessionState, StepKind,
};
