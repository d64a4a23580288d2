//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that drive the pipeline
//! without making real AI or database calls.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::context::RunContext;
use crate::error::{PipelineError, Result};
use crate::traits::{
    ClassifyResponse, DocumentAi, ExtractResponse, ExtractionFocus, StructureResponse,
    TherapyLookup, VerifyResponse,
};
use crate::types::{DocumentStructure, ExtractionResult, PageIndexedText, Therapy};

/// A mock AI implementation for testing.
///
/// Responses are scripted against text keys. A call first looks for an
/// exact match on the input text, then for the first scripted key (in
/// lexicographic order) contained in the input, so tests can script
/// against a fragment of a longer snippet. Unscripted calls return
/// permissive defaults.
#[derive(Default)]
pub struct MockAi {
    classifications: Arc<RwLock<BTreeMap<String, ClassifyResponse>>>,
    structures: Arc<RwLock<BTreeMap<String, DocumentStructure>>>,
    verifications: Arc<RwLock<BTreeMap<String, (bool, u8)>>>,
    extractions: Arc<RwLock<BTreeMap<String, ExtractionResult>>>,

    /// Keys whose calls should error instead of answering
    failing: Arc<RwLock<BTreeSet<String>>>,

    /// Tokens reported by every successful call
    tokens_per_call: u64,

    verification_calls: Arc<RwLock<Vec<VerificationCall>>>,
    extraction_calls: Arc<RwLock<Vec<ExtractionCall>>>,
    classify_calls: Arc<RwLock<Vec<String>>>,
    structure_calls: Arc<RwLock<Vec<u32>>>,
}

/// Record of one extraction call made to the mock.
#[derive(Debug, Clone)]
pub struct ExtractionCall {
    pub snippet: String,
    pub therapies: Vec<String>,
    pub focus: ExtractionFocus,
}

/// Record of one verification call made to the mock.
#[derive(Debug, Clone)]
pub struct VerificationCall {
    pub snippet: String,
    pub therapy_name: String,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this many tokens on every successful call.
    pub fn with_tokens_per_call(mut self, tokens: u64) -> Self {
        self.tokens_per_call = tokens;
        self
    }

    /// Script the classification for samples containing `key`.
    pub fn script_classification(
        &self,
        key: impl Into<String>,
        report_type: &str,
        company_name: Option<&str>,
        reporting_period: Option<&str>,
    ) {
        self.classifications.write().unwrap().insert(
            key.into(),
            ClassifyResponse {
                report_type: report_type.to_string(),
                company_name: company_name.map(str::to_string),
                reporting_period: reporting_period.map(str::to_string),
                tokens_used: 0,
            },
        );
    }

    /// Script the structure returned for documents containing `key`.
    pub fn script_structure(&self, key: impl Into<String>, structure: DocumentStructure) {
        self.structures.write().unwrap().insert(key.into(), structure);
    }

    /// Script the verification verdict for snippets containing `key`.
    pub fn script_verification(&self, key: impl Into<String>, contains: bool, confidence: u8) {
        self.verifications
            .write()
            .unwrap()
            .insert(key.into(), (contains, confidence));
    }

    /// Script the extraction result for snippets containing `key`.
    pub fn script_extraction(&self, key: impl Into<String>, result: ExtractionResult) {
        self.extractions.write().unwrap().insert(key.into(), result);
    }

    /// Make verification calls on snippets containing `key` fail.
    pub fn fail_verification(&self, key: impl Into<String>) {
        self.failing.write().unwrap().insert(fail_key("verify", &key.into()));
    }

    /// Make extraction calls on snippets containing `key` fail.
    pub fn fail_extraction(&self, key: impl Into<String>) {
        self.failing.write().unwrap().insert(fail_key("extract", &key.into()));
    }

    /// Make classification calls on samples containing `key` fail.
    pub fn fail_classification(&self, key: impl Into<String>) {
        self.failing.write().unwrap().insert(fail_key("classify", &key.into()));
    }

    /// Make structure calls on documents containing `key` fail.
    pub fn fail_structure(&self, key: impl Into<String>) {
        self.failing.write().unwrap().insert(fail_key("structure", &key.into()));
    }

    /// Verification calls made, in call order.
    pub fn verification_calls(&self) -> Vec<VerificationCall> {
        self.verification_calls.read().unwrap().clone()
    }

    /// Extraction calls made, in call order.
    pub fn extraction_calls(&self) -> Vec<ExtractionCall> {
        self.extraction_calls.read().unwrap().clone()
    }

    /// Samples passed to classification, in call order.
    pub fn classify_calls(&self) -> Vec<String> {
        self.classify_calls.read().unwrap().clone()
    }

    /// Page counts of documents passed to structure analysis.
    pub fn structure_calls(&self) -> Vec<u32> {
        self.structure_calls.read().unwrap().clone()
    }

    fn should_fail(&self, op: &str, text: &str) -> bool {
        self.failing
            .read()
            .unwrap()
            .iter()
            .any(|entry| match entry.split_once('|') {
                Some((entry_op, key)) => entry_op == op && text.contains(key),
                None => false,
            })
    }
}

fn fail_key(op: &str, key: &str) -> String {
    format!("{op}|{key}")
}

fn mock_failure(what: &str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("mock {what} failure"),
    ))
}

/// Exact match first, then first scripted key contained in the text.
fn lookup<T: Clone>(map: &BTreeMap<String, T>, text: &str) -> Option<T> {
    if let Some(value) = map.get(text) {
        return Some(value.clone());
    }
    map.iter()
        .find(|(key, _)| text.contains(key.as_str()))
        .map(|(_, value)| value.clone())
}

#[async_trait]
impl DocumentAi for MockAi {
    async fn classify(&self, _ctx: &RunContext, sample: &str) -> Result<ClassifyResponse> {
        self.classify_calls.write().unwrap().push(sample.to_string());

        if self.should_fail("classify", sample) {
            return Err(PipelineError::Classification(mock_failure("classification")));
        }

        let mut response = lookup(&self.classifications.read().unwrap(), sample)
            .unwrap_or_else(|| ClassifyResponse {
                report_type: "other".to_string(),
                company_name: None,
                reporting_period: None,
                tokens_used: 0,
            });
        response.tokens_used = self.tokens_per_call;
        Ok(response)
    }

    async fn analyze_structure(
        &self,
        _ctx: &RunContext,
        text: &PageIndexedText,
    ) -> Result<StructureResponse> {
        self.structure_calls.write().unwrap().push(text.page_count());

        let full = text.full_text();
        if self.should_fail("structure", &full) {
            return Err(PipelineError::StructureAnalysis(mock_failure("structure")));
        }

        let structure = lookup(&self.structures.read().unwrap(), &full)
            .unwrap_or_else(DocumentStructure::unstructured);
        Ok(StructureResponse {
            structure,
            tokens_used: self.tokens_per_call,
        })
    }

    async fn verify_revenue(
        &self,
        _ctx: &RunContext,
        snippet: &str,
        therapy_name: &str,
    ) -> Result<VerifyResponse> {
        self.verification_calls.write().unwrap().push(VerificationCall {
            snippet: snippet.to_string(),
            therapy_name: therapy_name.to_string(),
        });

        if self.should_fail("verify", snippet) {
            return Err(PipelineError::Verification(mock_failure("verification")));
        }

        let (contains, confidence) =
            lookup(&self.verifications.read().unwrap(), snippet).unwrap_or((true, 75));
        Ok(VerifyResponse {
            contains_revenue_data: contains,
            confidence,
            reasoning: "mock verdict".to_string(),
            tokens_used: self.tokens_per_call,
        })
    }

    async fn extract_revenue(
        &self,
        _ctx: &RunContext,
        snippet: &str,
        therapies: &[Therapy],
        focus: ExtractionFocus,
    ) -> Result<ExtractResponse> {
        self.extraction_calls.write().unwrap().push(ExtractionCall {
            snippet: snippet.to_string(),
            therapies: therapies.iter().map(|t| t.name.clone()).collect(),
            focus,
        });

        if self.should_fail("extract", snippet) {
            return Err(PipelineError::Extraction(mock_failure("extraction")));
        }

        let result = lookup(&self.extractions.read().unwrap(), snippet)
            .unwrap_or_else(|| ExtractionResult::new(vec![], 50));
        Ok(ExtractResponse {
            result,
            tokens_used: self.tokens_per_call,
        })
    }
}

/// A mock therapy catalog for testing.
///
/// Companies are matched case-insensitively, like the real store.
#[derive(Default)]
pub struct MockTherapies {
    by_company: Arc<RwLock<HashMap<String, Vec<Therapy>>>>,
    fail_all: Arc<RwLock<bool>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockTherapies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register therapies for a company.
    pub fn with_company(
        self,
        company: impl Into<String>,
        therapies: Vec<Therapy>,
    ) -> Self {
        self.by_company
            .write()
            .unwrap()
            .insert(company.into().to_lowercase(), therapies);
        self
    }

    /// Make every lookup fail.
    pub fn failing(self) -> Self {
        *self.fail_all.write().unwrap() = true;
        self
    }

    /// Companies looked up, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl TherapyLookup for MockTherapies {
    async fn therapies_for_company(&self, company: &str) -> Result<Vec<Therapy>> {
        self.calls.write().unwrap().push(company.to_string());

        if *self.fail_all.read().unwrap() {
            return Err(PipelineError::TherapyLookup(mock_failure("therapy lookup")));
        }

        Ok(self
            .by_company
            .read()
            .unwrap()
            .get(&company.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
