//! Data model for the Assessment & Triage service

pub mod assessment;
pub mod composite;
pub mod modality;
pub mod review;

pub use assessment::{Assessment, AssessmentMetadata, AssessmentStatus, AssessmentSummary, AssessmentType};
pub use composite::{CompositeResult, Insights, Recommendation, StressLevel, Urgency};
pub use modality::{
    Channel, Emotion, ModalityDetail, ModalityScore, QuestionnaireResponse, SentimentLabel,
    StressCategory, SubscaleScore, SubscaleSeverity,
};
pub use review::{Review, ReviewPatch, ReviewStatus, RiskAssessment};
