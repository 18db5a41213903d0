use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{DuplicateEntry, StoreStatus};
use crate::store::{count_rows, metadata_value, open_store_read_only};

pub fn run(args: StatusArgs) -> Result<ExitCode> {
    let db_path = args.store.resolved_db_path();
    info!(data_root = %args.store.data_root.display(), "status requested");

    let Some(connection) = open_store_read_only(&db_path)? else {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(ExitCode::SUCCESS);
    };
    let status = collect_status(&connection)?;

    info!(
        path = %db_path.display(),
        db_schema_version = %status.db_schema_version.clone().unwrap_or_default(),
        db_updated_at = %status.db_updated_at.clone().unwrap_or_default(),
        assessments = status.assessments,
        metrics = status.metrics,
        results = status.results,
        recommendations = status.recommendations,
        associations = status.associations,
        "database status"
    );

    if status.assessments_without_results > 0 {
        warn!(
            count = status.assessments_without_results,
            "assessments without results rows"
        );
    }
    for duplicate in &status.duplicated_entry_ids {
        warn!(
            entry_id = %duplicate.entry_id,
            assessments = duplicate.assessment_count,
            "entry id stored more than once"
        );
    }

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &status)
            .context("failed to serialize store status")?;
        writeln!(output)?;
        output.flush()?;
    }

    Ok(ExitCode::SUCCESS)
}

pub(crate) fn collect_status(connection: &Connection) -> Result<StoreStatus> {
    Ok(StoreStatus {
        db_schema_version: metadata_value(connection, "db_schema_version")?,
        db_updated_at: metadata_value(connection, "db_updated_at")?,
        assessments: count_rows(connection, "SELECT COUNT(*) FROM lpa_assessments")?,
        metrics: count_rows(connection, "SELECT COUNT(*) FROM lpa_metrics")?,
        results: count_rows(connection, "SELECT COUNT(*) FROM lpa_results")?,
        recommendations: count_rows(connection, "SELECT COUNT(*) FROM lpa_recommendations")?,
        associations: count_rows(
            connection,
            "SELECT COUNT(*) FROM lpa_assessment_recommendations",
        )?,
        assessments_without_results: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM lpa_assessments a
            LEFT JOIN lpa_results r ON r.assessment_id = a.assessment_id
            WHERE r.assessment_id IS NULL
            ",
        )?,
        duplicated_entry_ids: duplicated_entry_ids(connection)?,
    })
}

fn duplicated_entry_ids(connection: &Connection) -> Result<Vec<DuplicateEntry>> {
    let mut statement = connection.prepare(
        "
        SELECT entry_id, COUNT(*)
        FROM lpa_assessments
        GROUP BY entry_id
        HAVING COUNT(*) > 1
        ORDER BY entry_id ASC
        ",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(DuplicateEntry {
            entry_id: row.get(0)?,
            assessment_count: row.get(1)?,
        })
    })?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to list duplicated entry ids")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_test_store;

    #[test]
    fn collect_status_reports_orphans_and_duplicates() {
        let connection = open_test_store();
        for entry_id in ["501", "501", "502"] {
            connection
                .execute(
                    "INSERT INTO lpa_assessments(
                       entry_id, respondent_name, respondent_email, job_title, company_size,
                       tech_team_size, business_model, tech_complexity, workforce_deployment,
                       created_at
                     )
                     VALUES(?1, 'X', '', '', '', 0, '', '', '', '2026-01-01T00:00:00Z')",
                    [entry_id],
                )
                .expect("seed assessment");
        }

        let status = collect_status(&connection).expect("status");

        assert_eq!(status.assessments, 3);
        assert_eq!(status.results, 0);
        assert_eq!(status.assessments_without_results, 3);
        assert_eq!(status.duplicated_entry_ids.len(), 1);
        assert_eq!(status.duplicated_entry_ids[0].entry_id, "501");
        assert_eq!(status.duplicated_entry_ids[0].assessment_count, 2);

        let json = serde_json::to_value(&status).expect("status json");
        assert_eq!(json["assessments_without_results"], 3);
        assert_eq!(json["duplicated_entry_ids"][0]["entry_id"], "501");
    }
}
