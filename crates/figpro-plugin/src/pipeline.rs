//! Generation pipeline
//!
//! Drives one preset request end to end: match the trigger word, pass
//! admission, invoke the image generator, and settle the debit with exactly
//! one terminal outcome. A request that is admitted and then fails
//! downstream is refunded to whichever ledger the admission debited; a
//! request that succeeds keeps its debit.
//!
//! The chat dispatch layer hands messages in and renders outcomes out; the
//! real image-generation HTTP client lives behind [`ImageGenerator`].

use std::sync::Arc;

use figpro_economy::{DebitSource, EconomyManager, REQUEST_COST};
use uuid::Uuid;

use crate::presets::PresetStore;

/// Marker a prompt template carries when no input image is required.
const TEXT_ONLY_MARKER: &str = "text_only";

/// Failure reported by an image generator.
///
/// The message is user-facing; the pipeline forwards it verbatim in the
/// failure outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GenerationError {
    /// Human-readable description of what went wrong upstream
    pub message: String,
}

impl GenerationError {
    /// Build an error from any displayable message.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces one image from a prompt and optional input images.
///
/// Implementations wrap the external image-generation API; they own their
/// transport, retries, and response parsing.
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image.
    ///
    /// # Errors
    /// `GenerationError` with a user-facing message when the upstream call
    /// fails or yields no image.
    async fn generate(
        &self,
        prompt: &str,
        images: &[Vec<u8>],
    ) -> Result<Vec<u8>, GenerationError>;
}

/// Terminal outcome of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The message matched no preset trigger, or the sender is ignored
    NotHandled,
    /// Admission declined the request; the reason is user-facing
    Declined {
        /// Rejection reason, with a check-in hint when check-in is on
        reason: String,
    },
    /// The preset needs an input image the message did not carry
    MissingImage,
    /// Generation failed downstream; any debit has been refunded
    Failed {
        /// Generator's user-facing failure message
        reason: String,
    },
    /// Image produced; the debit is kept
    Generated {
        /// The generated image bytes
        image: Vec<u8>,
        /// Remaining user balance, reported when the user gate is on
        remaining: Option<u64>,
    },
}

/// Wires the preset store, the economy, and an image generator together.
pub struct GenerationPipeline {
    economy: Arc<EconomyManager>,
    presets: Arc<PresetStore>,
    generator: Arc<dyn ImageGenerator>,
}

impl GenerationPipeline {
    /// Build a pipeline over shared economy and preset state.
    #[inline]
    #[must_use]
    pub fn new(
        economy: Arc<EconomyManager>,
        presets: Arc<PresetStore>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            economy,
            presets,
            generator,
        }
    }

    /// Handle one inbound chat message.
    ///
    /// The first whitespace-separated token is the trigger word; the rest
    /// of the message extends the preset prompt. Admitted requests are
    /// settled with exactly one terminal outcome: the debit is kept on
    /// success and refunded on any failure after admission.
    pub async fn handle_message(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        text: &str,
        images: &[Vec<u8>],
    ) -> PipelineOutcome {
        let text = text.trim();
        let Some(trigger) = text.split_whitespace().next() else {
            return PipelineOutcome::NotHandled;
        };
        let Some(template) = self.presets.get(trigger).await else {
            return PipelineOutcome::NotHandled;
        };

        let config = self.economy.config();
        if config.is_blacklisted(user_id) {
            tracing::debug!(user_id, trigger, "request from blacklisted user dropped");
            return PipelineOutcome::NotHandled;
        }

        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, user_id, group_id, trigger, "generation request received");

        // Admins skip the economy entirely: no debit, nothing to refund.
        let debited = if config.is_admin(user_id) {
            None
        } else {
            let decision = self
                .economy
                .is_request_admitted(user_id, group_id, REQUEST_COST)
                .await;
            if !decision.admitted {
                let mut reason = decision.reason;
                if config.enable_checkin {
                    reason.push_str("\ntip: daily check-in grants free credits");
                }
                tracing::info!(%request_id, user_id, "request declined");
                return PipelineOutcome::Declined { reason };
            }
            Some(decision.source)
        };

        let extra = text[trigger.len()..].trim();
        let prompt = if extra.is_empty() {
            template.clone()
        } else {
            format!("{template}, {extra}")
        };

        // Image-to-image presets cannot start without an input image, so
        // the debit is returned before the generator is ever invoked.
        if images.is_empty() && !template.contains(TEXT_ONLY_MARKER) {
            self.settle_refund(user_id, group_id, debited).await;
            tracing::info!(%request_id, user_id, "request missing input image");
            return PipelineOutcome::MissingImage;
        }

        match self.generator.generate(&prompt, images).await {
            Ok(image) => {
                let remaining = if debited.is_some() && config.enable_user_limit {
                    Some(self.economy.get_user_balance(user_id).await)
                } else {
                    None
                };
                tracing::info!(%request_id, user_id, bytes = image.len(), "generation succeeded");
                PipelineOutcome::Generated { image, remaining }
            }
            Err(e) => {
                self.settle_refund(user_id, group_id, debited).await;
                tracing::warn!(%request_id, user_id, error = %e, "generation failed, debit refunded");
                PipelineOutcome::Failed { reason: e.message }
            }
        }
    }

    /// Refund the admission's debit, if one was made.
    async fn settle_refund(
        &self,
        user_id: &str,
        group_id: Option<&str>,
        debited: Option<DebitSource>,
    ) {
        if let Some(source) = debited {
            self.economy
                .refund(user_id, group_id, REQUEST_COST, source)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figpro_economy::EconomyConfig;
    use tempfile::tempdir;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl ImageGenerator for NeverCalled {
        async fn generate(
            &self,
            _prompt: &str,
            _images: &[Vec<u8>],
        ) -> Result<Vec<u8>, GenerationError> {
            panic!("generator must not be invoked");
        }
    }

    async fn pipeline_in(dir: &std::path::Path, config: EconomyConfig) -> GenerationPipeline {
        let economy = Arc::new(EconomyManager::open(dir, config).await);
        let presets = Arc::new(PresetStore::open(dir).await);
        GenerationPipeline::new(economy, presets, Arc::new(NeverCalled))
    }

    #[tokio::test]
    async fn empty_message_is_not_handled() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), EconomyConfig::default()).await;

        let outcome = pipeline.handle_message("u1", None, "   ", &[]).await;
        assert_eq!(outcome, PipelineOutcome::NotHandled);
    }

    #[tokio::test]
    async fn unknown_trigger_is_not_handled() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), EconomyConfig::default()).await;

        let outcome = pipeline
            .handle_message("u1", None, "watercolor make it blue", &[])
            .await;
        assert_eq!(outcome, PipelineOutcome::NotHandled);
    }

    #[tokio::test]
    async fn declined_reason_carries_checkin_hint() {
        let dir = tempdir().unwrap();
        let config = EconomyConfig::default().with_fixed_checkin(3);
        let pipeline = pipeline_in(dir.path(), config).await;

        let outcome = pipeline
            .handle_message("u1", None, "figurine", &[vec![1]])
            .await;
        match outcome {
            PipelineOutcome::Declined { reason } => {
                assert!(reason.contains("user balance insufficient"));
                assert!(reason.contains("daily check-in"));
            }
            other => panic!("expected declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn declined_reason_omits_hint_when_checkin_off() {
        let dir = tempdir().unwrap();
        let pipeline = pipeline_in(dir.path(), EconomyConfig::default()).await;

        let outcome = pipeline
            .handle_message("u1", None, "figurine", &[vec![1]])
            .await;
        match outcome {
            PipelineOutcome::Declined { reason } => {
                assert!(!reason.contains("check-in"));
            }
            other => panic!("expected declined, got {other:?}"),
        }
    }
}
