use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FIELD_MAP_VERSION: u32 = 1;

/// Binding from semantic assessment attributes to the form engine's field
/// identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMap {
    pub version: u32,
    pub entry_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    pub company_size: String,
    pub tech_team_size: String,
    pub business_model: String,
    pub tech_complexity: String,
    pub workforce_deployment: String,
    pub decision_effectiveness: String,
    pub team_autonomy: String,
    pub leadership_success: String,
    pub ready_leaders: String,
    pub dependencies: String,
    pub pipeline_health: String,
    pub decision_index: String,
    pub risk_level: String,
    pub growth_capacity: String,
    pub leadership_density: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::canonical()
    }
}

impl FieldMap {
    pub fn canonical() -> Self {
        Self {
            version: FIELD_MAP_VERSION,
            entry_id: "id".to_string(),
            first_name: "24.3".to_string(),
            last_name: "24.6".to_string(),
            email: "3".to_string(),
            job_title: "4".to_string(),
            company_size: "5".to_string(),
            tech_team_size: "6".to_string(),
            business_model: "7".to_string(),
            tech_complexity: "8".to_string(),
            workforce_deployment: "38".to_string(),
            decision_effectiveness: "10".to_string(),
            team_autonomy: "25".to_string(),
            leadership_success: "36".to_string(),
            ready_leaders: "27".to_string(),
            dependencies: "28".to_string(),
            pipeline_health: "40".to_string(),
            decision_index: "41".to_string(),
            risk_level: "42".to_string(),
            growth_capacity: "43".to_string(),
            leadership_density: "44".to_string(),
        }
    }

    /// Attribute name and identifier for every form field, excluding the
    /// entry id key.
    pub fn field_bindings(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("job_title", &self.job_title),
            ("company_size", &self.company_size),
            ("tech_team_size", &self.tech_team_size),
            ("business_model", &self.business_model),
            ("tech_complexity", &self.tech_complexity),
            ("workforce_deployment", &self.workforce_deployment),
            ("decision_effectiveness", &self.decision_effectiveness),
            ("team_autonomy", &self.team_autonomy),
            ("leadership_success", &self.leadership_success),
            ("ready_leaders", &self.ready_leaders),
            ("dependencies", &self.dependencies),
            ("pipeline_health", &self.pipeline_health),
            ("decision_index", &self.decision_index),
            ("risk_level", &self.risk_level),
            ("growth_capacity", &self.growth_capacity),
            ("leadership_density", &self.leadership_density),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != FIELD_MAP_VERSION {
            bail!(
                "unsupported field map version {} (expected {FIELD_MAP_VERSION})",
                self.version
            );
        }

        let entry_key = self.entry_id.trim();
        if entry_key.is_empty() || entry_key.contains(char::is_whitespace) {
            bail!("entry_id key must be a non-empty token");
        }

        let pattern =
            Regex::new(r"^\d+(\.\d+)?$").context("failed to compile field identifier regex")?;

        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        seen.insert(entry_key, "entry_id");

        for (attribute, identifier) in self.field_bindings() {
            if !pattern.is_match(identifier) {
                bail!("field identifier for {attribute} is malformed: {identifier:?}");
            }
            if let Some(previous) = seen.insert(identifier, attribute) {
                bail!("field identifier {identifier} is bound to both {previous} and {attribute}");
            }
        }

        Ok(())
    }
}

/// Loads the field map from `path`, or the canonical one when absent, and
/// validates it.
pub fn load_field_map(path: Option<&Path>) -> Result<FieldMap> {
    let field_map = match path {
        Some(path) => {
            let raw =
                fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice::<FieldMap>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => FieldMap::canonical(),
    };

    field_map
        .validate()
        .context("field map failed validation")?;
    Ok(field_map)
}

/// Truncating integer parse over the leading numeric prefix of `raw`.
///
/// Leading whitespace and a sign are accepted; anything without digits
/// yields 0. A prefix with an exponent (`1e3`, `2.5E2`) is read as a float
/// first. Out-of-range values saturate.
pub fn coerce_int(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return 0;
    };
    let text = raw.trim_start();
    let (negative, digits) = split_sign(text);
    if has_exponent(digits) {
        return coerce_float(Some(text)) as i64;
    }

    let mut value: i64 = 0;
    let mut saw_digit = false;
    for ch in digits.chars() {
        let Some(digit) = ch.to_digit(10) else {
            break;
        };
        saw_digit = true;
        value = value.saturating_mul(10).saturating_add(i64::from(digit));
    }

    if !saw_digit {
        return 0;
    }
    if negative { value.saturating_neg() } else { value }
}

/// Float parse over the leading numeric prefix of `raw`; 0.0 when there is
/// none.
pub fn coerce_float(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || mantissa_digits > 0 {
            mantissa_digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match text[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn has_exponent(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    let mut index = bytes.iter().take_while(|byte| byte.is_ascii_digit()).count();
    let mut mantissa_digits = index;
    if bytes.get(index) == Some(&b'.') {
        let fraction = bytes[index + 1..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count();
        mantissa_digits += fraction;
        index += 1 + fraction;
    }
    if mantissa_digits == 0 || !matches!(bytes.get(index), Some(b'e' | b'E')) {
        return false;
    }

    index += 1;
    if matches!(bytes.get(index), Some(b'+' | b'-')) {
        index += 1;
    }
    bytes.get(index).is_some_and(u8::is_ascii_digit)
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn canonical_map_is_valid_and_binds_workforce_to_38() {
        let field_map = FieldMap::canonical();
        field_map.validate().expect("canonical map should validate");
        assert_eq!(field_map.workforce_deployment, "38");
        assert_eq!(field_map.first_name, "24.3");
        assert_eq!(field_map.field_bindings().len(), 19);
    }

    #[test]
    fn validate_rejects_duplicate_identifiers() {
        let mut field_map = FieldMap::canonical();
        field_map.workforce_deployment = "9".to_string();
        field_map.tech_complexity = "9".to_string();

        let err = field_map.validate().expect_err("duplicate should fail");
        assert!(err.to_string().contains("bound to both"));
    }

    #[test]
    fn validate_rejects_malformed_identifiers() {
        let mut field_map = FieldMap::canonical();
        field_map.email = "email".to_string();
        assert!(field_map.validate().is_err());

        let mut field_map = FieldMap::canonical();
        field_map.last_name = "24.".to_string();
        assert!(field_map.validate().is_err());
    }

    #[test]
    fn load_field_map_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let mut value = serde_json::to_value(FieldMap::canonical()).expect("serialize");
        value["nickname"] = serde_json::json!("12");
        write!(file, "{value}").expect("write map");

        assert!(load_field_map(Some(file.path())).is_err());
    }

    #[test]
    fn load_field_map_reads_override() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let mut field_map = FieldMap::canonical();
        field_map.workforce_deployment = "9".to_string();
        write!(
            file,
            "{}",
            serde_json::to_string(&field_map).expect("serialize")
        )
        .expect("write map");

        let loaded = load_field_map(Some(file.path())).expect("override should load");
        assert_eq!(loaded.workforce_deployment, "9");
    }

    #[test]
    fn coerce_int_truncates_and_defaults_to_zero() {
        assert_eq!(coerce_int(Some("42")), 42);
        assert_eq!(coerce_int(Some("  12abc")), 12);
        assert_eq!(coerce_int(Some("3.9")), 3);
        assert_eq!(coerce_int(Some("-7")), -7);
        assert_eq!(coerce_int(Some("abc")), 0);
        assert_eq!(coerce_int(Some("")), 0);
        assert_eq!(coerce_int(None), 0);
        assert_eq!(coerce_int(Some("99999999999999999999999")), i64::MAX);
    }

    #[test]
    fn coerce_int_reads_exponent_forms_as_floats() {
        assert_eq!(coerce_int(Some("1e3")), 1000);
        assert_eq!(coerce_int(Some("2.5E2 staff")), 250);
        assert_eq!(coerce_int(Some("-1.5e1")), -15);
        assert_eq!(coerce_int(Some("7e")), 7);
        assert_eq!(coerce_int(Some("4e-1")), 0);
        assert_eq!(coerce_int(Some("1e30")), i64::MAX);
    }

    #[test]
    fn coerce_float_reads_numeric_prefix() {
        assert_eq!(coerce_float(Some("72.5")), 72.5);
        assert_eq!(coerce_float(Some("81%")), 81.0);
        assert_eq!(coerce_float(Some(".5")), 0.5);
        assert_eq!(coerce_float(Some("1e2x")), 100.0);
        assert_eq!(coerce_float(Some("2e")), 2.0);
        assert_eq!(coerce_float(Some("-")), 0.0);
        assert_eq!(coerce_float(Some("inf")), 0.0);
        assert_eq!(coerce_float(Some("1e999")), 0.0);
        assert_eq!(coerce_float(None), 0.0);
    }
}
