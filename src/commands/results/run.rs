use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::cli::{OutputFormat, ResultsArgs};
use crate::commands::handled_failure;
use crate::error::{LpaError, Lookup};
use crate::store::open_store_read_only;

use super::assemble::{assemble_results, requested_assessment_id, resolve_entry};
use super::render::{escape_html, write_html, write_json, write_text};
use super::steps::StepSplitter;

pub fn run(args: ResultsArgs) -> Result<ExitCode> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    let code = run_with_output(args, &mut output)?;
    output.flush()?;
    Ok(code)
}

pub(super) fn run_with_output(args: ResultsArgs, output: &mut impl Write) -> Result<ExitCode> {
    let steps = StepSplitter::new()?;
    let requested_id = requested_assessment_id(args.assessment.as_deref(), args.id.as_deref());
    let db_path = args.store.resolved_db_path();

    let outcome = match (args.entry_id.as_deref().map(str::trim), requested_id) {
        (Some(""), _) | (None, None) => Err(LpaError::NoAssessment),
        (Some(entry_id), _) => match open_store_read_only(&db_path)? {
            Some(connection) => resolve_entry(&connection, entry_id)
                .and_then(|id| assemble_results(&connection, Some(id), &steps)),
            None => Err(LpaError::NotFound {
                lookup: Lookup::Entry(entry_id.to_string()),
            }),
        },
        (None, Some(id)) => match open_store_read_only(&db_path)? {
            Some(connection) => assemble_results(&connection, Some(id), &steps),
            None => Err(LpaError::NotFound {
                lookup: Lookup::Assessment(id),
            }),
        },
    };

    let view = match outcome {
        Ok(view) => view,
        Err(err) => {
            log_lookup_failure(&err);
            let message = err.user_message();
            match args.format {
                OutputFormat::Html => writeln!(output, "<p>{}</p>", escape_html(&message))?,
                OutputFormat::Text | OutputFormat::Json => writeln!(output, "{message}")?,
            }
            output.flush()?;
            return Ok(handled_failure());
        }
    };

    info!(
        assessment_id = view.assessment_id,
        recommendations = view.recommendations.len(),
        "results assembled"
    );

    match args.format {
        OutputFormat::Text => write_text(output, &view)?,
        OutputFormat::Json => write_json(output, &view)?,
        OutputFormat::Html => write_html(output, &view)?,
    }
    output.flush()?;

    Ok(ExitCode::SUCCESS)
}

fn log_lookup_failure(err: &LpaError) {
    match err {
        LpaError::NoAssessment => warn!("results requested without an assessment id"),
        LpaError::NotFound { lookup } => warn!(lookup = %lookup, "no results stored"),
        LpaError::StorageRead { lookup, source } => {
            error!(lookup = %lookup, error = %source, "failed to read results")
        }
        other => error!(error = %other, "unexpected results failure"),
    }
}
