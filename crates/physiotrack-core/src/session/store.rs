use crate::error::Result;
use crate::exercise::{Exercise, SessionDefinition};

use super::SessionInstance;

/// Persistent store consumed by the session coordinator.
///
/// Instance ids are assigned by `add_session_instance` and stay stable.
/// There is a single writer per instance, so the latest write wins.
pub trait SessionStore {
    fn get_exercises(&self) -> Result<Vec<Exercise>>;

    fn get_session_definition(&self, id: &str) -> Result<Option<SessionDefinition>>;

    /// Insert a new instance and return its id.
    fn add_session_instance(&self, instance: &SessionInstance) -> Result<String>;

    fn update_session_instance(&self, instance: &SessionInstance) -> Result<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn get_exercises(&self) -> Result<Vec<Exercise>> {
        (**self).get_exercises()
    }

    fn get_session_definition(&self, id: &str) -> Result<Option<SessionDefinition>> {
        (**self).get_session_definition(id)
    }

    fn add_session_instance(&self, instance: &SessionInstance) -> Result<String> {
        (**self).add_session_instance(instance)
    }

    fn update_session_instance(&self, instance: &SessionInstance) -> Result<()> {
        (**self).update_session_instance(instance)
    }
}
