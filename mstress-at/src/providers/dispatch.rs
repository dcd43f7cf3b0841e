//! Concurrent per-channel dispatch
//!
//! Runs every present channel concurrently with a bounded timeout and
//! per-channel error isolation: a slow or failed channel recovers to local
//! fallback synthesis without blocking or failing the others. Provider
//! failures are logged but never surfaced to the caller.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{Channel, ModalityScore};
use crate::providers::{ChannelInput, ModalityProvider, ProviderError};
use crate::scoring::{adapter, fallback, FallbackContext};

/// Default per-channel timeout used when no configuration is supplied
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(8);

/// Dispatches present channels to the scoring provider and collects
/// normalized scores, substituting fallbacks per channel as needed
pub struct ChannelDispatcher {
    provider: Option<Arc<dyn ModalityProvider>>,
    channel_timeout: Duration,
}

impl ChannelDispatcher {
    pub fn new(provider: Option<Arc<dyn ModalityProvider>>, channel_timeout: Duration) -> Self {
        Self {
            provider,
            channel_timeout,
        }
    }

    /// Dispatcher with no provider: every channel scores via fallback
    pub fn offline() -> Self {
        Self::new(None, DEFAULT_CHANNEL_TIMEOUT)
    }

    /// Provider version recorded in assessment metadata, when configured
    pub fn provider_version(&self) -> Option<String> {
        self.provider.as_ref().map(|p| p.version())
    }

    /// Score all present channels concurrently
    ///
    /// Returns one `ModalityScore` per input, in input order. Never fails:
    /// each channel independently recovers to fallback synthesis on
    /// timeout, provider error, or malformed output.
    pub async fn collect_scores(&self, inputs: &[ChannelInput]) -> Vec<ModalityScore> {
        let futures = inputs.iter().map(|input| self.score_channel(input));
        join_all(futures).await
    }

    async fn score_channel(&self, input: &ChannelInput) -> ModalityScore {
        let channel = input.channel();

        match self.call_provider(input).await {
            Ok(raw) => match adapter::normalize(channel, &raw) {
                Ok(score) => {
                    debug!(channel = %channel, score = score.score, "Provider analysis normalized");
                    score
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Malformed provider output, synthesizing fallback");
                    fallback::synthesize(channel, &self.fallback_context(input))
                }
            },
            Err(e) => {
                warn!(channel = %channel, error = %e, "Provider call failed, synthesizing fallback");
                fallback::synthesize(channel, &self.fallback_context(input))
            }
        }
    }

    async fn call_provider(&self, input: &ChannelInput) -> Result<serde_json::Value, ProviderError> {
        let provider = self.provider.as_ref().ok_or(ProviderError::NotConfigured)?;
        tokio::time::timeout(self.channel_timeout, provider.analyze(input))
            .await
            .map_err(|_| ProviderError::Timeout(input.channel()))?
    }

    fn fallback_context<'a>(&self, input: &'a ChannelInput) -> FallbackContext<'a> {
        match input {
            ChannelInput::Questionnaire(responses) => FallbackContext {
                questionnaire_responses: Some(responses),
                stress_hint: None,
            },
            _ => FallbackContext::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::models::QuestionnaireResponse;

    /// Provider stub with per-channel canned behavior
    struct StubProvider {
        fail_channels: Vec<Channel>,
        slow_channels: Vec<Channel>,
    }

    #[async_trait]
    impl ModalityProvider for StubProvider {
        fn version(&self) -> String {
            "stub:1".to_string()
        }

        async fn analyze(&self, input: &ChannelInput) -> Result<Value, ProviderError> {
            let channel = input.channel();
            if self.slow_channels.contains(&channel) {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            if self.fail_channels.contains(&channel) {
                return Err(ProviderError::Unavailable {
                    channel,
                    reason: "stubbed outage".to_string(),
                });
            }
            Ok(match channel {
                Channel::Questionnaire => json!({"overall": {"percentage": 54.0}}),
                Channel::Facial => json!({"stress_assessment": {"stress_score": 62.0, "confidence": 0.8}}),
                Channel::Voice => json!({"stress": {"score": 58.0}}),
                Channel::Sentiment => json!({"negative": 0.8, "positive": 0.1}),
            })
        }
    }

    fn answers() -> Vec<QuestionnaireResponse> {
        (0..20)
            .map(|question_index| QuestionnaireResponse {
                question_index,
                value: 2,
                category: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_channels_succeed() {
        let dispatcher = ChannelDispatcher::new(
            Some(Arc::new(StubProvider {
                fail_channels: vec![],
                slow_channels: vec![],
            })),
            Duration::from_millis(500),
        );
        let inputs = vec![
            ChannelInput::Questionnaire(answers()),
            ChannelInput::Facial("aGk=".into()),
            ChannelInput::Voice("aGk=".into()),
            ChannelInput::Sentiment("rough week".into()),
        ];
        let scores = dispatcher.collect_scores(&inputs).await;
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|s| !s.is_fallback));
        assert_eq!(scores[0].channel, Channel::Questionnaire);
        assert_eq!(scores[3].channel, Channel::Sentiment);
    }

    #[tokio::test]
    async fn test_failed_channel_falls_back_without_blocking_others() {
        let dispatcher = ChannelDispatcher::new(
            Some(Arc::new(StubProvider {
                fail_channels: vec![Channel::Facial],
                slow_channels: vec![],
            })),
            Duration::from_millis(500),
        );
        let inputs = vec![
            ChannelInput::Questionnaire(answers()),
            ChannelInput::Facial("aGk=".into()),
        ];
        let scores = dispatcher.collect_scores(&inputs).await;
        assert!(!scores[0].is_fallback);
        assert!(scores[1].is_fallback);
    }

    #[tokio::test]
    async fn test_slow_channel_times_out_to_fallback() {
        let dispatcher = ChannelDispatcher::new(
            Some(Arc::new(StubProvider {
                fail_channels: vec![],
                slow_channels: vec![Channel::Voice],
            })),
            Duration::from_millis(50),
        );
        let inputs = vec![
            ChannelInput::Voice("aGk=".into()),
            ChannelInput::Sentiment("fine".into()),
        ];
        let scores = dispatcher.collect_scores(&inputs).await;
        assert!(scores[0].is_fallback);
        assert!(!scores[1].is_fallback);
    }

    #[tokio::test]
    async fn test_offline_dispatcher_scores_questionnaire_locally() {
        let dispatcher = ChannelDispatcher::offline();
        let inputs = vec![
            ChannelInput::Questionnaire(answers()),
            ChannelInput::Sentiment("fine".into()),
        ];
        let scores = dispatcher.collect_scores(&inputs).await;
        assert!(scores.iter().all(|s| s.is_fallback));
        // Local deterministic scoring, not a placeholder
        assert!(matches!(
            scores[0].detail,
            crate::models::ModalityDetail::Questionnaire { .. }
        ));
        assert_eq!(scores[1].detail, crate::models::ModalityDetail::Unavailable);
    }
}
