//! Guard configuration.
use serde::Serialize;

/// Scores are stored on-chain with one implied decimal (1000 = 100.0).
const SCORE_PRECISION: f64 = 10.0;

/// Which guard slot of a task a guard occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardKind {
    Submission,
    Review,
}

/// `getSubmissionConfig()` as reported by a submission guard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionGuardConfig {
    pub min_reputation_score: u64,
    pub min_category_score: u64,
    pub max_failed_submissions: u64,
    pub min_success_rate: u64,
    pub require_category_expertise: bool,
    pub enforce_success_rate: bool,
    pub required_category: String,
}

/// `getReviewConfig()` as reported by a review guard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewGuardConfig {
    pub min_reputation_score: u64,
    pub min_category_score: u64,
    pub min_review_count: u64,
    pub min_accuracy_rate: u64,
    pub require_category_expertise: bool,
    pub enforce_accuracy_rate: bool,
    pub required_category: String,
}

/// The requirements a guard imposes, for display. Unset fields impose nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRequirement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_reputation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_category_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_submissions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_success_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_review_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_accuracy_rate: Option<u64>,
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn to_score(value: u64) -> Option<f64> {
    (value != 0).then(|| value as f64 / SCORE_PRECISION)
}

fn to_whole(value: u64) -> Option<u64> {
    (value != 0).then_some(value)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

impl From<&SubmissionGuardConfig> for GuardRequirement {
    fn from(config: &SubmissionGuardConfig) -> Self {
        let mut requirement = Self {
            min_reputation: to_score(config.min_reputation_score),
            max_failed_submissions: to_whole(config.max_failed_submissions),
            ..Self::default()
        };

        if config.require_category_expertise {
            requirement.min_category_score = to_score(config.min_category_score);
            requirement.required_category = non_empty(&config.required_category);
        }
        if config.enforce_success_rate {
            requirement.min_success_rate = to_whole(config.min_success_rate);
        }

        requirement
    }
}

impl From<&ReviewGuardConfig> for GuardRequirement {
    fn from(config: &ReviewGuardConfig) -> Self {
        let mut requirement = Self {
            min_reputation: to_score(config.min_reputation_score),
            min_review_count: to_whole(config.min_review_count),
            ..Self::default()
        };

        if config.require_category_expertise {
            requirement.min_category_score = to_score(config.min_category_score);
            requirement.required_category = non_empty(&config.required_category);
        }
        if config.enforce_accuracy_rate {
            requirement.min_accuracy_rate = to_whole(config.min_accuracy_rate);
        }

        requirement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_guard_requirements() {
        let config = SubmissionGuardConfig {
            min_reputation_score: 600,
            min_category_score: 250,
            max_failed_submissions: 3,
            min_success_rate: 80,
            require_category_expertise: true,
            enforce_success_rate: false,
            required_category: "design".to_owned(),
        };

        let requirement = GuardRequirement::from(&config);
        assert_eq!(requirement.min_reputation, Some(60.0));
        assert_eq!(requirement.min_category_score, Some(25.0));
        assert_eq!(requirement.required_category.as_deref(), Some("design"));
        assert_eq!(requirement.max_failed_submissions, Some(3));
        // Not enforced, so not shown.
        assert_eq!(requirement.min_success_rate, None);
    }

    #[test]
    fn review_guard_ignores_category_without_expertise() {
        let config = ReviewGuardConfig {
            min_reputation_score: 0,
            min_category_score: 500,
            min_review_count: 10,
            min_accuracy_rate: 70,
            require_category_expertise: false,
            enforce_accuracy_rate: true,
            required_category: "code".to_owned(),
        };

        let requirement = GuardRequirement::from(&config);
        assert_eq!(requirement.min_reputation, None);
        assert_eq!(requirement.min_category_score, None);
        assert_eq!(requirement.required_category, None);
        assert_eq!(requirement.min_review_count, Some(10));
        assert_eq!(requirement.min_accuracy_rate, Some(70));
    }
}
