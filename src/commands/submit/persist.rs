use rusqlite::{Connection, Transaction, params};
use tracing::{error, info, warn};

use crate::error::{LpaError, LpaResult};
use crate::field_map::FieldMap;
use crate::model::AssessmentRecord;
use crate::util::now_utc_string;

use super::mapper::{RawSubmission, map_submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredAssessment {
    pub assessment_id: i64,
    pub entry_id: String,
    pub created_at: String,
}

/// Maps and stores one submission. Validation and write failures are
/// logged here with the entry id before being returned.
pub(crate) fn submit_entry(
    connection: &mut Connection,
    raw: &RawSubmission,
    field_map: &FieldMap,
) -> LpaResult<StoredAssessment> {
    let record = match map_submission(raw, field_map) {
        Ok(record) => record,
        Err(err) => {
            warn!(
                entry_key = %field_map.entry_id,
                field_count = raw.fields.len(),
                source_sha256 = %raw.sha256,
                error = %err,
                "submission rejected"
            );
            return Err(err);
        }
    };

    match persist_record(connection, &record) {
        Ok(stored) => {
            info!(
                entry_id = %stored.entry_id,
                assessment_id = stored.assessment_id,
                source_sha256 = %record.assessment.source_sha256,
                "assessment stored"
            );
            Ok(stored)
        }
        Err(err) => {
            error!(
                entry_id = %record.assessment.entry_id,
                error = %err,
                "assessment write rolled back"
            );
            Err(err)
        }
    }
}

/// Writes assessment, metrics and results in one transaction. Nothing is
/// visible unless all three inserts succeed.
pub(crate) fn persist_record(
    connection: &mut Connection,
    record: &AssessmentRecord,
) -> LpaResult<StoredAssessment> {
    let entry_id = record.assessment.entry_id.clone();
    let write_err = |step: &'static str| {
        let entry_id = entry_id.clone();
        move |source: rusqlite::Error| LpaError::StorageWrite {
            entry_id,
            step,
            source,
        }
    };

    let created_at = now_utc_string();
    let tx = connection
        .transaction()
        .map_err(write_err("begin transaction"))?;

    let assessment_id =
        insert_assessment(&tx, record, &created_at).map_err(write_err("insert assessment"))?;
    insert_metrics(&tx, assessment_id, record).map_err(write_err("insert metrics"))?;
    insert_results(&tx, assessment_id, record, &created_at)
        .map_err(write_err("insert results"))?;

    tx.commit().map_err(write_err("commit"))?;

    Ok(StoredAssessment {
        assessment_id,
        entry_id,
        created_at,
    })
}

fn insert_assessment(
    tx: &Transaction<'_>,
    record: &AssessmentRecord,
    created_at: &str,
) -> rusqlite::Result<i64> {
    let assessment = &record.assessment;
    tx.execute(
        "
        INSERT INTO lpa_assessments(
          entry_id, respondent_name, respondent_email, job_title, company_size,
          tech_team_size, business_model, tech_complexity, workforce_deployment,
          source_sha256, created_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ",
        params![
            assessment.entry_id,
            assessment.respondent_name,
            assessment.respondent_email,
            assessment.job_title,
            assessment.company_size,
            assessment.tech_team_size,
            assessment.business_model,
            assessment.tech_complexity,
            assessment.workforce_deployment,
            assessment.source_sha256,
            created_at,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn insert_metrics(
    tx: &Transaction<'_>,
    assessment_id: i64,
    record: &AssessmentRecord,
) -> rusqlite::Result<()> {
    let metrics = &record.metrics;
    tx.execute(
        "
        INSERT INTO lpa_metrics(
          assessment_id, decision_effectiveness, team_autonomy,
          leadership_success, ready_leaders, dependencies
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            assessment_id,
            metrics.decision_effectiveness,
            metrics.team_autonomy,
            metrics.leadership_success,
            metrics.ready_leaders,
            metrics.dependencies,
        ],
    )?;
    Ok(())
}

fn insert_results(
    tx: &Transaction<'_>,
    assessment_id: i64,
    record: &AssessmentRecord,
    created_at: &str,
) -> rusqlite::Result<()> {
    let results = &record.results;
    tx.execute(
        "
        INSERT INTO lpa_results(
          assessment_id, pipeline_health, decision_index, risk_level,
          growth_capacity, leadership_density, created_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            assessment_id,
            results.pipeline_health,
            results.decision_index,
            results.risk_level,
            results.growth_capacity,
            results.leadership_density,
            created_at,
        ],
    )?;
    Ok(())
}
