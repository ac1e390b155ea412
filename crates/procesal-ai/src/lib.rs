//! AI enrichment layer: an LLM seam, the Gemini client behind it, and the
//! summarisation/classification contract built on top.

mod classifier;
mod enricher;
#[cfg(feature = "gemini")]
mod gemini;
mod llm;

pub use classifier::{Classification, parse_classification, strip_code_fence};
pub use enricher::{
    CLASSIFICATION_FAILED, EMPTY_CLASSIFICATION_TEXT, EMPTY_SUMMARY_TEXT, Enricher, EnrichmentError,
    MISSING_CREDENTIALS, SUMMARY_FAILED, is_blank,
};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiClientConfig};
pub use llm::{LlmClient, LlmError, LlmRequest, MockLlmClient};
