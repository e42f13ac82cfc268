// Detection Module
// Fallacy detection pipeline organized into specialized submodules:
// - prompts: system/user instructions built from the fallacy catalogue
// - normalizer: strips code fences and parses the raw reply as JSON
// - assembler: coerces the parsed reply into a DetectionOutcome field by field
// - llm_analyzer: FallacyDetector, gating plus gateway -> normalizer -> assembler

pub mod prompts;
pub mod normalizer;
pub mod assembler;
pub mod llm_analyzer;

// Re-export commonly used items
pub use normalizer::{normalize_reply, strip_code_fence, NormalizeError};
pub use assembler::{assemble_outcome, confidence_or_zero};
pub use llm_analyzer::{DetectionError, FallacyDetector};
