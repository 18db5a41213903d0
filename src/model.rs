use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub entry_id: String,
    pub respondent_name: String,
    pub respondent_email: String,
    pub job_title: String,
    pub company_size: String,
    pub tech_team_size: i64,
    pub business_model: String,
    pub tech_complexity: String,
    pub workforce_deployment: String,
    pub source_sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricScores {
    pub decision_effectiveness: i64,
    pub team_autonomy: i64,
    pub leadership_success: i64,
    pub ready_leaders: i64,
    pub dependencies: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultScores {
    pub pipeline_health: f64,
    pub decision_index: f64,
    pub risk_level: f64,
    pub growth_capacity: f64,
    pub leadership_density: f64,
}

/// Normalized form of one submission, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub assessment: NewAssessment,
    pub metrics: MetricScores,
    pub results: ResultScores,
}

/// Hand-off produced by a successful submit.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub assessment_id: i64,
    pub entry_id: String,
    pub results_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Other(value) => value,
        }
    }

    /// Display rank; anything outside the known set sorts last.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Other(_) => 4,
        }
    }

    pub fn label(&self) -> String {
        let value = self.as_str();
        let mut chars = value.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEntry {
    pub recommendation_id: i64,
    pub priority: Priority,
    pub title: String,
    pub impact_description: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RespondentView {
    pub name: String,
    pub email: String,
    pub job_title: String,
    pub company_size: String,
    pub tech_team_size: i64,
    pub workforce_deployment: String,
}

/// Everything a renderer needs to show one assessment's results.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub assessment_id: i64,
    pub entry_id: String,
    pub respondent: RespondentView,
    pub assessment_date: String,
    pub results: ResultScores,
    pub recommendations: Vec<RecommendationEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub recommendation_id: i64,
    pub priority: Priority,
    pub recommendation: String,
    pub impact_description: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub db_schema_version: Option<String>,
    pub db_updated_at: Option<String>,
    pub assessments: i64,
    pub metrics: i64,
    pub results: i64,
    pub recommendations: i64,
    pub associations: i64,
    pub assessments_without_results: i64,
    pub duplicated_entry_ids: Vec<DuplicateEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateEntry {
    pub entry_id: String,
    pub assessment_count: i64,
}

#[cfg(test)]
mod tests {
    use super::Priority;

    #[test]
    fn priority_parse_is_case_insensitive_and_keeps_unknown_values() {
        assert_eq!(Priority::parse("Critical"), Priority::Critical);
        assert_eq!(Priority::parse(" low "), Priority::Low);
        assert_eq!(
            Priority::parse("urgent"),
            Priority::Other("urgent".to_string())
        );
        assert_eq!(Priority::parse("urgent").rank(), 4);
    }

    #[test]
    fn priority_label_capitalizes_first_letter() {
        assert_eq!(Priority::High.label(), "High");
        assert_eq!(Priority::Other("someday".to_string()).label(), "Someday");
        assert_eq!(Priority::Other(String::new()).label(), "");
    }
}
