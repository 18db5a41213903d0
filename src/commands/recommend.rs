use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::cli::{RecommendAddArgs, RecommendAttachArgs, RecommendListArgs};
use crate::commands::results::{StepSplitter, join_steps};
use crate::model::{CatalogEntry, Priority};
use crate::store::{open_store, open_store_read_only};

pub fn add(args: RecommendAddArgs) -> Result<ExitCode> {
    let priority = Priority::parse(&args.priority);
    if let Priority::Other(value) = &priority {
        warn!(priority = %value, "unknown priority; entry will sort after low");
    }

    let connection = open_store(&args.store.resolved_db_path())?;
    let recommendation_id = insert_recommendation(
        &connection,
        &args.text,
        &args.impact,
        &args.steps,
        &priority,
    )?;

    info!(recommendation_id, priority = %priority, "recommendation added");
    println!("recommendation_id: {recommendation_id}");
    Ok(ExitCode::SUCCESS)
}

pub fn attach(args: RecommendAttachArgs) -> Result<ExitCode> {
    let mut connection = open_store(&args.store.resolved_db_path())?;
    let attached =
        attach_recommendations(&mut connection, args.assessment, &args.recommendations)?;

    info!(assessment_id = args.assessment, attached, "recommendations attached");
    Ok(ExitCode::SUCCESS)
}

pub fn list(args: RecommendListArgs) -> Result<ExitCode> {
    let steps = StepSplitter::new()?;
    let catalog = match open_store_read_only(&args.store.resolved_db_path())? {
        Some(connection) => list_catalog(&connection, &steps)?,
        None => Vec::new(),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &catalog)
            .context("failed to serialize recommendation catalog")?;
        writeln!(output)?;
    } else {
        writeln!(output, "Recommendations: {}", catalog.len())?;
        for entry in &catalog {
            writeln!(
                output,
                "{}.\t{}\t{}",
                entry.recommendation_id,
                entry.priority.label(),
                entry.recommendation
            )?;
            for (index, step) in entry.steps.iter().enumerate() {
                writeln!(output, "\tstep[{}]: {step}", index + 1)?;
            }
        }
    }
    output.flush()?;

    Ok(ExitCode::SUCCESS)
}

pub(crate) fn insert_recommendation(
    connection: &Connection,
    text: &str,
    impact: &str,
    steps: &[String],
    priority: &Priority,
) -> Result<i64> {
    let text = text.trim();
    if text.is_empty() {
        bail!("recommendation text must not be empty");
    }

    connection
        .execute(
            "
            INSERT INTO lpa_recommendations(
              recommendation, impact_description, implementation_steps, priority
            )
            VALUES(?1, ?2, ?3, ?4)
            ",
            params![text, impact.trim(), join_steps(steps), priority.as_str()],
        )
        .context("failed to insert recommendation")?;

    Ok(connection.last_insert_rowid())
}

/// Links recommendations to an assessment in the given order. All links are
/// written or none; pairs already linked are skipped. Returns the number of
/// new links.
pub(crate) fn attach_recommendations(
    connection: &mut Connection,
    assessment_id: i64,
    recommendation_ids: &[i64],
) -> Result<usize> {
    let tx = connection.transaction()?;

    let exists = tx
        .query_row(
            "SELECT 1 FROM lpa_assessments WHERE assessment_id = ?1",
            [assessment_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        bail!("assessment {assessment_id} does not exist");
    }

    let mut attached = 0;
    {
        let mut statement = tx.prepare(
            "INSERT OR IGNORE INTO lpa_assessment_recommendations(assessment_id, recommendation_id)
             VALUES(?1, ?2)",
        )?;
        for recommendation_id in recommendation_ids {
            attached += statement
                .execute(params![assessment_id, recommendation_id])
                .with_context(|| {
                    format!(
                        "failed to attach recommendation {recommendation_id} to assessment {assessment_id}"
                    )
                })?;
        }
    }

    tx.commit()?;
    Ok(attached)
}

pub(crate) fn list_catalog(
    connection: &Connection,
    steps: &StepSplitter,
) -> Result<Vec<CatalogEntry>> {
    let mut statement = connection.prepare(
        "
        SELECT recommendation_id, priority, recommendation, impact_description, implementation_steps
        FROM lpa_recommendations
        ORDER BY recommendation_id ASC
        ",
    )?;

    let rows = statement.query_map([], |row| {
        let priority: String = row.get(1)?;
        let stored_steps: String = row.get(4)?;
        Ok(CatalogEntry {
            recommendation_id: row.get(0)?,
            priority: Priority::parse(&priority),
            recommendation: row.get(2)?,
            impact_description: row.get(3)?,
            steps: steps.split(&stored_steps),
        })
    })?;

    let mut catalog = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to load recommendation catalog")?;
    catalog.sort_by(|left, right| left.priority.cmp_rank(&right.priority));
    Ok(catalog)
}
