//! Modality scoring provider clients
//!
//! The scoring provider is an external collaborator reached over HTTP, one
//! request per channel. Providers are consumed behind the
//! `ModalityProvider` trait so the dispatcher (and tests) can substitute
//! implementations; `HttpScoringProvider` is the production client.

pub mod dispatch;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Channel, QuestionnaireResponse};

pub use dispatch::ChannelDispatcher;

/// Provider call errors; all variants recover via fallback synthesis
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider timeout on {0} channel")]
    Timeout(Channel),

    #[error("Provider unavailable for {channel} channel: {reason}")]
    Unavailable { channel: Channel, reason: String },

    #[error("Provider returned non-success status {status} for {channel} channel")]
    BadStatus { channel: Channel, status: u16 },

    #[error("Provider response unparseable for {channel} channel: {reason}")]
    InvalidResponse { channel: Channel, reason: String },

    /// No provider endpoint is configured at all
    #[error("No scoring provider configured")]
    NotConfigured,
}

/// Raw input for one channel's provider request
#[derive(Debug, Clone)]
pub enum ChannelInput {
    Questionnaire(Vec<QuestionnaireResponse>),
    /// Base64-encoded image frame
    Facial(String),
    /// Base64-encoded audio clip
    Voice(String),
    /// Free-text sample
    Sentiment(String),
}

impl ChannelInput {
    pub fn channel(&self) -> Channel {
        match self {
            ChannelInput::Questionnaire(_) => Channel::Questionnaire,
            ChannelInput::Facial(_) => Channel::Facial,
            ChannelInput::Voice(_) => Channel::Voice,
            ChannelInput::Sentiment(_) => Channel::Sentiment,
        }
    }
}

/// One modality scoring provider
#[async_trait]
pub trait ModalityProvider: Send + Sync {
    /// Provider version string recorded in assessment metadata
    fn version(&self) -> String;

    /// Score one channel's raw input, returning the channel-specific payload
    async fn analyze(&self, input: &ChannelInput) -> Result<Value, ProviderError>;
}

/// HTTP client for the modality scoring provider service
pub struct HttpScoringProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpScoringProvider {
    /// Create a client for the provider at `base_url`
    ///
    /// The request timeout is enforced at the client level; the dispatcher
    /// additionally bounds each channel call.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable {
                channel: Channel::Questionnaire,
                reason: format!("client build failed: {}", e),
            })?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Provider endpoint path per channel
    fn endpoint(&self, channel: Channel) -> String {
        let path = match channel {
            Channel::Questionnaire => "/score/dass21",
            Channel::Facial => "/analyze/facial-emotion",
            Channel::Voice => "/speech/analyze-stress",
            Channel::Sentiment => "/sentiment/analyze",
        };
        format!("{}{}", self.base_url, path)
    }

    fn request_body(input: &ChannelInput) -> Value {
        match input {
            ChannelInput::Questionnaire(responses) => json!({ "responses": responses }),
            ChannelInput::Facial(image) => json!({ "image_data": image }),
            ChannelInput::Voice(audio) => json!({ "audio_data": audio }),
            ChannelInput::Sentiment(text) => json!({ "text": text }),
        }
    }
}

#[async_trait]
impl ModalityProvider for HttpScoringProvider {
    fn version(&self) -> String {
        format!("http:{}", self.base_url)
    }

    async fn analyze(&self, input: &ChannelInput) -> Result<Value, ProviderError> {
        let channel = input.channel();
        let url = self.endpoint(channel);

        let response = self
            .http_client
            .post(&url)
            .json(&Self::request_body(input))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(channel)
                } else {
                    ProviderError::Unavailable {
                        channel,
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus {
                channel,
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| ProviderError::InvalidResponse {
            channel,
            reason: e.to_string(),
        })
    }
}
