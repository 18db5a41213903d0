use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{LpaError, LpaResult};
use crate::field_map::{FieldMap, coerce_float, coerce_int};
use crate::model::{AssessmentRecord, MetricScores, NewAssessment, ResultScores};
use crate::util::sha256_hex;

/// A form entry as delivered by the form engine: opaque field identifiers
/// mapped to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawSubmission {
    pub fields: BTreeMap<String, String>,
    pub sha256: String,
}

impl RawSubmission {
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.fields.get(identifier).map(String::as_str)
    }

    fn text(&self, identifier: &str) -> String {
        self.get(identifier).map(str::trim).unwrap_or_default().to_string()
    }

    /// Builds a submission directly from pairs; the fingerprint covers the
    /// sorted `key=value` lines.
    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fields: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let canonical = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect::<String>();
        Self {
            sha256: sha256_hex(canonical.as_bytes()),
            fields,
        }
    }
}

/// Parses a flat JSON entry object. Scalars are stringified, `null` counts
/// as missing and nested values are rejected.
pub(crate) fn parse_entry_json(raw: &[u8]) -> LpaResult<RawSubmission> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| LpaError::validation(format!("entry is not valid JSON ({err})")))?;
    let Value::Object(object) = value else {
        return Err(LpaError::validation("entry must be a JSON object"));
    };

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => String::from(if flag { "1" } else { "0" }),
            Value::Array(_) | Value::Object(_) => {
                return Err(LpaError::validation(format!(
                    "field {key} must be a scalar value"
                )));
            }
        };
        fields.insert(key, text);
    }

    Ok(RawSubmission {
        fields,
        sha256: sha256_hex(raw),
    })
}

/// Normalizes a raw entry into the three records written for it.
pub(crate) fn map_submission(
    raw: &RawSubmission,
    field_map: &FieldMap,
) -> LpaResult<AssessmentRecord> {
    let entry_id = raw.text(&field_map.entry_id);
    if entry_id.is_empty() {
        return Err(LpaError::validation("missing entry id"));
    }

    let respondent_name = format!(
        "{} {}",
        raw.text(&field_map.first_name),
        raw.text(&field_map.last_name)
    )
    .trim()
    .to_string();

    let int = |identifier: &str| coerce_int(raw.get(identifier));
    let float = |identifier: &str| coerce_float(raw.get(identifier));

    let assessment = NewAssessment {
        entry_id,
        respondent_name,
        respondent_email: raw.text(&field_map.email),
        job_title: raw.text(&field_map.job_title),
        company_size: raw.text(&field_map.company_size),
        tech_team_size: int(&field_map.tech_team_size).max(0),
        business_model: raw.text(&field_map.business_model),
        tech_complexity: raw.text(&field_map.tech_complexity),
        workforce_deployment: raw.text(&field_map.workforce_deployment),
        source_sha256: raw.sha256.clone(),
    };

    let metrics = MetricScores {
        decision_effectiveness: int(&field_map.decision_effectiveness),
        team_autonomy: int(&field_map.team_autonomy),
        leadership_success: int(&field_map.leadership_success),
        ready_leaders: int(&field_map.ready_leaders),
        dependencies: int(&field_map.dependencies),
    };

    let results = ResultScores {
        pipeline_health: float(&field_map.pipeline_health),
        decision_index: float(&field_map.decision_index),
        risk_level: float(&field_map.risk_level),
        growth_capacity: float(&field_map.growth_capacity),
        leadership_density: float(&field_map.leadership_density),
    };

    Ok(AssessmentRecord {
        assessment,
        metrics,
        results,
    })
}
