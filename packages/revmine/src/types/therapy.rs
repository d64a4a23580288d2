use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A marketed or pipeline therapy registered for a company.
///
/// The extraction prompts are scoped to these names so the model reports
/// revenue per therapy instead of a single company-wide figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapy {
    pub id: Uuid,
    pub name: String,
    pub manufacturer: String,
}

impl Therapy {
    pub fn new(name: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            manufacturer: manufacturer.into(),
        }
    }
}
