pub mod json_backend;

use crate::errors::Result;
use crate::wizard::autosave::Draft;

/// Abstraction over persistence backends that keep one draft per wizard.
pub trait DraftStore: Send + Sync {
    fn save(&self, draft: &Draft) -> Result<()>;
    fn load(&self, wizard: &str) -> Result<Draft>;
    fn list(&self) -> Result<Vec<DraftInfo>>;
    /// Returns whether a draft existed.
    fn discard(&self, wizard: &str) -> Result<bool>;

    fn try_load(&self, wizard: &str) -> Result<Option<Draft>> {
        match self.load(wizard) {
            Ok(draft) => Ok(Some(draft)),
            Err(crate::errors::WishError::DraftNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

pub use json_backend::{DraftInfo, JsonDraftStore};
