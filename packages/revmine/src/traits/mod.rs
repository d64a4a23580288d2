pub mod ai;
pub mod therapies;

pub use ai::{
    ClassifyResponse, DocumentAi, ExtractResponse, ExtractionFocus, StructureResponse,
    VerifyResponse,
};
pub use therapies::TherapyLookup;
