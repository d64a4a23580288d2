//! Lookup trait for the registered-therapy catalog.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Therapy;

/// Resolves the therapies registered for a company.
///
/// The pipeline scopes extraction prompts to these names. Backed by the
/// database in production and by an in-memory map in tests.
#[async_trait]
pub trait TherapyLookup: Send + Sync {
    /// All therapies registered for `company`, matched case-insensitively.
    ///
    /// An unknown company returns an empty list, not an error; the
    /// orchestrator decides whether that is fatal.
    async fn therapies_for_company(&self, company: &str) -> Result<Vec<Therapy>>;
}
