use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{LpaError, LpaResult, Lookup};
use crate::model::{Priority, RecommendationEntry, RespondentView, ResultScores, ResultsView};
use crate::util::display_date;

use super::steps::StepSplitter;

/// Strict parse of an untrusted identifier: a positive base-10 integer or
/// nothing.
pub(super) fn parse_assessment_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Picks the request identifier, falling back to the secondary one when
/// the primary is absent or unusable.
pub(super) fn requested_assessment_id(
    primary: Option<&str>,
    fallback: Option<&str>,
) -> Option<i64> {
    parse_assessment_id(primary).or_else(|| parse_assessment_id(fallback))
}

/// Most recent assessment stored for `entry_id`.
pub(super) fn resolve_entry(connection: &Connection, entry_id: &str) -> LpaResult<i64> {
    let entry_id = entry_id.trim();
    if entry_id.is_empty() {
        return Err(LpaError::NoAssessment);
    }
    let lookup = || Lookup::Entry(entry_id.to_string());

    connection
        .query_row(
            "
            SELECT assessment_id
            FROM lpa_assessments
            WHERE entry_id = ?1
            ORDER BY assessment_id DESC
            LIMIT 1
            ",
            [entry_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(|source| LpaError::StorageRead {
            lookup: lookup(),
            source,
        })?
        .ok_or_else(|| LpaError::NotFound { lookup: lookup() })
}

/// Builds the results view for `assessment_id`.
///
/// `None` is rejected before any storage access. A missing results row is
/// `NotFound` even if the assessment itself exists.
pub(super) fn assemble_results(
    connection: &Connection,
    assessment_id: Option<i64>,
    steps: &StepSplitter,
) -> LpaResult<ResultsView> {
    let Some(assessment_id) = assessment_id.filter(|id| *id > 0) else {
        return Err(LpaError::NoAssessment);
    };
    let read_err = |source: rusqlite::Error| LpaError::StorageRead {
        lookup: Lookup::Assessment(assessment_id),
        source,
    };

    let view = connection
        .query_row(
            "
            SELECT
              a.entry_id,
              a.respondent_name,
              a.respondent_email,
              a.job_title,
              a.company_size,
              a.tech_team_size,
              a.workforce_deployment,
              r.pipeline_health,
              r.decision_index,
              r.risk_level,
              r.growth_capacity,
              r.leadership_density,
              r.created_at
            FROM lpa_results r
            JOIN lpa_assessments a ON r.assessment_id = a.assessment_id
            WHERE r.assessment_id = ?1
            ",
            [assessment_id],
            |row| {
                let created_at: String = row.get(12)?;
                Ok(ResultsView {
                    assessment_id,
                    entry_id: row.get(0)?,
                    respondent: RespondentView {
                        name: row.get(1)?,
                        email: row.get(2)?,
                        job_title: row.get(3)?,
                        company_size: row.get(4)?,
                        tech_team_size: row.get(5)?,
                        workforce_deployment: row.get(6)?,
                    },
                    assessment_date: display_date(&created_at),
                    results: ResultScores {
                        pipeline_health: row.get(7)?,
                        decision_index: row.get(8)?,
                        risk_level: row.get(9)?,
                        growth_capacity: row.get(10)?,
                        leadership_density: row.get(11)?,
                    },
                    recommendations: Vec::new(),
                })
            },
        )
        .optional()
        .map_err(read_err)?;

    let Some(mut view) = view else {
        return Err(LpaError::NotFound {
            lookup: Lookup::Assessment(assessment_id),
        });
    };

    view.recommendations =
        load_recommendations(connection, assessment_id, steps).map_err(read_err)?;
    Ok(view)
}

/// Recommendations attached to an assessment, most severe first. Entries
/// of equal priority keep the order they were attached in.
pub(super) fn load_recommendations(
    connection: &Connection,
    assessment_id: i64,
    steps: &StepSplitter,
) -> rusqlite::Result<Vec<RecommendationEntry>> {
    let mut statement = connection.prepare(
        "
        SELECT
          rec.recommendation_id,
          rec.priority,
          rec.recommendation,
          rec.impact_description,
          rec.implementation_steps
        FROM lpa_assessment_recommendations ar
        JOIN lpa_recommendations rec ON rec.recommendation_id = ar.recommendation_id
        WHERE ar.assessment_id = ?1
        ORDER BY ar.rowid ASC
        ",
    )?;

    let rows = statement.query_map(params![assessment_id], |row| {
        let priority: String = row.get(1)?;
        let stored_steps: String = row.get(4)?;
        Ok(RecommendationEntry {
            recommendation_id: row.get(0)?,
            priority: Priority::parse(&priority),
            title: row.get(2)?,
            impact_description: row.get(3)?,
            steps: steps.split(&stored_steps),
        })
    })?;

    let mut entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    entries.sort_by(|left, right| left.priority.cmp_rank(&right.priority));
    Ok(entries)
}
