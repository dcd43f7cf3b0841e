//! Fallback synthesizer
//!
//! Produces a bounded, clearly-marked substitute `ModalityScore` when a
//! provider call fails or times out, so the pipeline never blocks on an
//! unavailable dependency. Deterministic and side-effect free: the
//! questionnaire channel is rescored locally from the raw answers (the
//! DASS-21 table needs no model service), and channels with no local
//! computation get a band-midpoint placeholder. Never calls external
//! services.

use chrono::Utc;
use tracing::warn;

use crate::models::{Channel, ModalityDetail, ModalityScore, QuestionnaireResponse, StressLevel};
use crate::scoring::dass21;

/// Upper bound on any fallback confidence, so synthesized channels can never
/// dominate a composite's reported confidence
pub const FALLBACK_CONFIDENCE_CEILING: f64 = 0.80;

/// Confidence assigned to a placeholder with no local signal
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.35;

/// Neutral default score when no stress-level hint is available
pub const NEUTRAL_DEFAULT_SCORE: f64 = 40.0;

/// Partial signals available to the synthesizer
#[derive(Debug, Clone, Default)]
pub struct FallbackContext<'a> {
    /// Raw questionnaire answers, when the submission carried them
    pub questionnaire_responses: Option<&'a [QuestionnaireResponse]>,
    /// Stress-level hint constraining the placeholder band
    pub stress_hint: Option<StressLevel>,
}

/// Synthesize a substitute score for one channel
///
/// Questionnaire with answers in context scores locally via the DASS-21
/// table at the fallback confidence ceiling. Everything else gets the
/// midpoint of the hinted band (or the neutral default) at placeholder
/// confidence. Always `is_fallback = true`.
pub fn synthesize(channel: Channel, ctx: &FallbackContext<'_>) -> ModalityScore {
    if channel == Channel::Questionnaire {
        if let Some(responses) = ctx.questionnaire_responses {
            match dass21::score(responses) {
                Ok(result) => {
                    return ModalityScore {
                        channel,
                        score: result.overall_percentage,
                        confidence: FALLBACK_CONFIDENCE_CEILING,
                        detail: ModalityDetail::Questionnaire {
                            total_raw_score: result.total_raw_score,
                            depression: result.depression,
                            anxiety: result.anxiety,
                            stress: result.stress,
                            category_scores: result.category_scores,
                        },
                        is_fallback: true,
                        computed_at: Utc::now(),
                    };
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Local questionnaire scoring failed, using placeholder");
                }
            }
        }
    }

    let score = ctx
        .stress_hint
        .map(|level| level.band_midpoint())
        .unwrap_or(NEUTRAL_DEFAULT_SCORE);

    ModalityScore {
        channel,
        score,
        confidence: PLACEHOLDER_CONFIDENCE.min(FALLBACK_CONFIDENCE_CEILING),
        detail: ModalityDetail::Unavailable,
        is_fallback: true,
        computed_at: Utc::now(),
    }
}
