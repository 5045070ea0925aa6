//! Terminal front end: prompts, scripted test input and the runner that
//! drives a wizard session.

pub mod commands;
pub mod interaction;
pub mod output;
pub mod runner;
pub mod terminal;
pub mod test_mode;

pub use interaction::{
    ConfirmationResponse, FormResult, FormSummary, PromptContext, PromptResponse,
    WizardInteraction,
};
pub use runner::WizardRunner;
pub use terminal::TerminalInteraction;
