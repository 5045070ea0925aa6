//! Headless multi-step form engine.

pub mod autosave;
pub mod schema;
pub mod session;
pub mod step;
pub mod submit;
pub mod values;

pub use autosave::{AutoSaver, Draft, DraftSink};
pub use schema::{FieldSchema, ObjectSchema, Rule, ValidationErrors};
pub use session::{NavigationDenied, Progress, StepOutcome, WizardOptions, WizardSession, WizardState};
pub use step::{FieldDescriptor, FieldKind, Step};
pub use submit::{SubmitBlocked, SubmitError, SubmitOutcome, SubmitTicket};
pub use values::FormValues;
