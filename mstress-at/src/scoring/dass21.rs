//! Local deterministic DASS-21 questionnaire scoring
//!
//! Implements the fixed 20-item DASS-21 scoring table: answers are summed
//! into depression / anxiety / stress subscales (question index modulo 3),
//! doubled per the DASS-21 convention, and rated against the published
//! severity thresholds. No model service is involved, so this scoring is
//! always computable and always returns the same result for the same
//! answers.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{QuestionnaireResponse, StressCategory, SubscaleScore, SubscaleSeverity};

/// Number of questionnaire items
pub const QUESTION_COUNT: usize = 20;

/// Maximum answer value (0-3 response scale)
pub const MAX_ANSWER_VALUE: u8 = 3;

/// Maximum doubled subscale score used for percentage scaling
pub const MAX_SUBSCALE_SCORE: f64 = 42.0;

/// Questionnaire scoring errors
#[derive(Debug, Error)]
pub enum Dass21Error {
    #[error("Expected {QUESTION_COUNT} responses, got {0}")]
    WrongResponseCount(usize),

    #[error("Response for question {index} out of range: {value} (must be 0-{MAX_ANSWER_VALUE})")]
    ValueOutOfRange { index: usize, value: u8 },

    #[error("Question index out of range: {0}")]
    IndexOutOfRange(usize),

    #[error("Duplicate response for question {0}")]
    DuplicateIndex(usize),
}

/// DASS-21 subscale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscale {
    Depression,
    Anxiety,
    Stress,
}

impl Subscale {
    /// Fixed question-to-subscale mapping for the 20-item form
    fn for_question(index: usize) -> Subscale {
        match index % 3 {
            0 => Subscale::Depression,
            1 => Subscale::Anxiety,
            _ => Subscale::Stress,
        }
    }

    /// Severity thresholds: upper bounds for normal / mild / moderate / severe
    fn thresholds(&self) -> [u32; 4] {
        match self {
            Subscale::Depression => [9, 13, 20, 27],
            Subscale::Anxiety => [7, 9, 14, 19],
            Subscale::Stress => [14, 18, 25, 33],
        }
    }

    fn severity(&self, score: u32) -> SubscaleSeverity {
        let [normal, mild, moderate, severe] = self.thresholds();
        if score <= normal {
            SubscaleSeverity::Normal
        } else if score <= mild {
            SubscaleSeverity::Mild
        } else if score <= moderate {
            SubscaleSeverity::Moderate
        } else if score <= severe {
            SubscaleSeverity::Severe
        } else {
            SubscaleSeverity::ExtremelySevere
        }
    }
}

/// Full scoring outcome for one set of answers
#[derive(Debug, Clone)]
pub struct Dass21Result {
    pub total_raw_score: u32,
    pub depression: SubscaleScore,
    pub anxiety: SubscaleScore,
    pub stress: SubscaleScore,
    /// Mean of the three doubled subscale scores, as a 0-100 percentage
    pub overall_percentage: f64,
    /// Per-category percentages from category-tagged answers
    pub category_scores: BTreeMap<StressCategory, f64>,
}

/// Score a complete set of questionnaire answers
///
/// Requires exactly [`QUESTION_COUNT`] answers covering each question index
/// once, each valued 0-3.
///
/// # Errors
/// Fails on a wrong answer count, an out-of-range value, an out-of-range or
/// duplicated question index.
pub fn score(responses: &[QuestionnaireResponse]) -> Result<Dass21Result, Dass21Error> {
    if responses.len() != QUESTION_COUNT {
        return Err(Dass21Error::WrongResponseCount(responses.len()));
    }

    let mut values = [None::<u8>; QUESTION_COUNT];
    for response in responses {
        if response.question_index >= QUESTION_COUNT {
            return Err(Dass21Error::IndexOutOfRange(response.question_index));
        }
        if response.value > MAX_ANSWER_VALUE {
            return Err(Dass21Error::ValueOutOfRange {
                index: response.question_index,
                value: response.value,
            });
        }
        if values[response.question_index].is_some() {
            return Err(Dass21Error::DuplicateIndex(response.question_index));
        }
        values[response.question_index] = Some(response.value);
    }

    let mut raw_sums = [0u32; 3];
    let mut total_raw_score = 0u32;
    for (index, value) in values.iter().enumerate() {
        // Each index was filled exactly once above
        let value = value.unwrap_or(0) as u32;
        total_raw_score += value;
        match Subscale::for_question(index) {
            Subscale::Depression => raw_sums[0] += value,
            Subscale::Anxiety => raw_sums[1] += value,
            Subscale::Stress => raw_sums[2] += value,
        }
    }

    let subscale_score = |subscale: Subscale, raw_sum: u32| {
        // DASS-21 convention: doubled to the 21-item scale
        let scaled = raw_sum * 2;
        SubscaleScore {
            raw_score: scaled,
            severity: subscale.severity(scaled),
            percentage: round1(scaled as f64 / MAX_SUBSCALE_SCORE * 100.0),
        }
    };

    let depression = subscale_score(Subscale::Depression, raw_sums[0]);
    let anxiety = subscale_score(Subscale::Anxiety, raw_sums[1]);
    let stress = subscale_score(Subscale::Stress, raw_sums[2]);

    let overall =
        (depression.raw_score + anxiety.raw_score + stress.raw_score) as f64 / 3.0;
    let overall_percentage = (overall / MAX_SUBSCALE_SCORE * 100.0).clamp(0.0, 100.0);

    Ok(Dass21Result {
        total_raw_score,
        depression,
        anxiety,
        stress,
        overall_percentage,
        category_scores: category_scores(responses),
    })
}

/// Per-category percentages from category-tagged answers
///
/// Each tagged answer contributes `value / 3` to its category; the category
/// score is the mean contribution as a percentage. Untagged answers carry no
/// category signal.
fn category_scores(responses: &[QuestionnaireResponse]) -> BTreeMap<StressCategory, f64> {
    let mut sums: BTreeMap<StressCategory, (f64, f64)> = BTreeMap::new();
    for response in responses {
        if let Some(category) = response.category {
            let entry = sums.entry(category).or_insert((0.0, 0.0));
            entry.0 += response.value as f64;
            entry.1 += MAX_ANSWER_VALUE as f64;
        }
    }
    sums.into_iter()
        .map(|(category, (score, max))| (category, round1(score / max * 100.0)))
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses_from_values(values: &[u8]) -> Vec<QuestionnaireResponse> {
        values
            .iter()
            .enumerate()
            .map(|(question_index, &value)| QuestionnaireResponse {
                question_index,
                value,
                category: None,
            })
            .collect()
    }

    #[test]
    fn test_all_zero_answers_score_zero() {
        let result = score(&responses_from_values(&[0; 20])).unwrap();
        assert_eq!(result.total_raw_score, 0);
        assert_eq!(result.depression.raw_score, 0);
        assert_eq!(result.overall_percentage, 0.0);
        assert_eq!(result.depression.severity, SubscaleSeverity::Normal);
    }

    #[test]
    fn test_all_max_answers_hit_extremely_severe() {
        let result = score(&responses_from_values(&[3; 20])).unwrap();
        // 7 depression questions x 3 x 2 = 42
        assert_eq!(result.depression.raw_score, 42);
        assert_eq!(result.anxiety.raw_score, 42);
        // 6 stress questions x 3 x 2 = 36
        assert_eq!(result.stress.raw_score, 36);
        assert_eq!(result.depression.severity, SubscaleSeverity::ExtremelySevere);
        assert_eq!(result.stress.severity, SubscaleSeverity::ExtremelySevere);
    }

    #[test]
    fn test_raw_total_34_lands_in_high_band() {
        // Overall depends only on the answer total: 34 x 2 / 3 / 42 = 53.97%
        let mut values = [0u8; 20];
        let mut remaining = 34u32;
        for v in values.iter_mut() {
            let take = remaining.min(3);
            *v = take as u8;
            remaining -= take;
        }
        assert_eq!(remaining, 0);
        let result = score(&responses_from_values(&values)).unwrap();
        assert_eq!(result.total_raw_score, 34);
        assert!((result.overall_percentage - 53.968).abs() < 0.01);
        assert!(result.overall_percentage >= 50.0 && result.overall_percentage < 75.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let values: Vec<u8> = (0..20).map(|i| (i % 4) as u8).collect();
        let first = score(&responses_from_values(&values)).unwrap();
        let second = score(&responses_from_values(&values)).unwrap();
        assert_eq!(first.overall_percentage, second.overall_percentage);
        assert_eq!(first.depression.raw_score, second.depression.raw_score);
    }

    #[test]
    fn test_answer_order_does_not_matter() {
        let values: Vec<u8> = (0..20).map(|i| (i % 4) as u8).collect();
        let mut shuffled = responses_from_values(&values);
        shuffled.reverse();
        let ordered = score(&responses_from_values(&values)).unwrap();
        let reversed = score(&shuffled).unwrap();
        assert_eq!(ordered.overall_percentage, reversed.overall_percentage);
    }

    #[test]
    fn test_wrong_count_rejected() {
        assert!(matches!(
            score(&responses_from_values(&[0; 19])),
            Err(Dass21Error::WrongResponseCount(19))
        ));
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let mut responses = responses_from_values(&[0; 20]);
        responses[5].value = 4;
        assert!(matches!(
            score(&responses),
            Err(Dass21Error::ValueOutOfRange { index: 5, value: 4 })
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut responses = responses_from_values(&[1; 20]);
        responses[19].question_index = 0;
        assert!(matches!(score(&responses), Err(Dass21Error::DuplicateIndex(0))));
    }

    #[test]
    fn test_category_tagged_answers_produce_breakdown() {
        let mut responses = responses_from_values(&[1; 20]);
        responses[0].category = Some(StressCategory::Work);
        responses[0].value = 3;
        responses[1].category = Some(StressCategory::Work);
        responses[1].value = 3;
        responses[2].category = Some(StressCategory::Social);
        responses[2].value = 0;

        let result = score(&responses).unwrap();
        assert_eq!(result.category_scores[&StressCategory::Work], 100.0);
        assert_eq!(result.category_scores[&StressCategory::Social], 0.0);
        assert!(!result.category_scores.contains_key(&StressCategory::Health));
    }
}
