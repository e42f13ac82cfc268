// LLM Analyzer
// Runs one fragment through Model Gateway -> Response Normalizer -> Result Assembler

use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::DetectionOutcome;
use crate::services::config_store::{AppConfig, Dialect};
use crate::services::providers::{ModelGateway, ProviderError};
use crate::services::text_processor::trimmed_char_count;

use super::assembler::assemble_outcome;
use super::normalizer::{normalize_reply, NormalizeError};
use super::prompts::{system_prompt, user_prompt};

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

pub struct FallacyDetector {
    gateway: ModelGateway,
    min_text_chars: usize,
}

impl FallacyDetector {
    pub fn new(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            gateway: ModelGateway::new(config)?,
            min_text_chars: config.min_text_chars,
        })
    }

    pub fn min_text_chars(&self) -> usize {
        self.min_text_chars
    }

    pub fn endpoint(&self) -> String {
        self.gateway.endpoint()
    }

    pub fn dialect(&self) -> Dialect {
        self.gateway.dialect()
    }

    /// Trimmed length (in characters) reaches the configured minimum.
    pub fn is_analyzable(&self, text: &str) -> bool {
        trimmed_char_count(text) >= self.min_text_chars
    }

    /// Text below the threshold yields an empty outcome without touching the model.
    pub async fn detect(&self, text: &str) -> Result<DetectionOutcome, DetectionError> {
        if !self.is_analyzable(text) {
            return Ok(DetectionOutcome::default());
        }

        let started = Instant::now();
        let reply = self
            .gateway
            .complete(system_prompt(), &user_prompt(text))
            .await?;
        let document = normalize_reply(&reply.content)?;
        let outcome = assemble_outcome(&document);

        let unknown_kinds = outcome.records.iter().filter(|r| !r.kind.is_known()).count();
        info!(
            "[DETECTOR] done records={} unknown_kinds={} has_issues={} confidence={} model_ms={} elapsed_ms={}",
            outcome.records.len(),
            unknown_kinds,
            outcome.has_issues,
            outcome.overall_confidence,
            reply.latency_ms,
            started.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Like `detect`, but a failure becomes an empty outcome carrying the error text.
    pub async fn detect_or_degrade(&self, text: &str) -> DetectionOutcome {
        match self.detect(text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("[DETECTOR] detection failed: {}", e);
                DetectionOutcome::degraded(e.to_string())
            }
        }
    }
}
