use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::SubmitArgs;
use crate::commands::handled_failure;
use crate::error::LpaError;
use crate::field_map::load_field_map;
use crate::model::SubmitReceipt;
use crate::store::open_store;
use crate::util::write_json_pretty;

use super::mapper::parse_entry_json;
use super::persist::submit_entry;

pub fn run(args: SubmitArgs) -> Result<ExitCode> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    let code = run_with_output(args, &mut output)?;
    output.flush()?;
    Ok(code)
}

pub(super) fn run_with_output(args: SubmitArgs, output: &mut impl Write) -> Result<ExitCode> {
    let field_map = load_field_map(args.field_map_path.as_deref())?;
    let raw_entry = read_entry(&args.entry)?;

    let db_path = args.store.resolved_db_path();
    info!(entry = %args.entry.display(), db_path = %db_path.display(), "submission received");

    let raw = match parse_entry_json(&raw_entry) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(entry = %args.entry.display(), error = %err, "submission rejected");
            return report_failure(output, &err);
        }
    };

    let mut connection = open_store(&db_path)?;
    let stored = match submit_entry(&mut connection, &raw, &field_map) {
        Ok(stored) => stored,
        Err(err) => return report_failure(output, &err),
    };

    let receipt = SubmitReceipt {
        assessment_id: stored.assessment_id,
        results_url: results_url(&args.results_url, stored.assessment_id),
        entry_id: stored.entry_id,
        created_at: stored.created_at,
    };

    // The row is committed; from here on the receipt must reach the caller.
    if args.json {
        serde_json::to_writer_pretty(&mut *output, &receipt)
            .context("failed to serialize submit receipt")?;
        writeln!(output)?;
    } else {
        writeln!(output, "assessment_id: {}", receipt.assessment_id)?;
        writeln!(output, "entry_id: {}", receipt.entry_id)?;
        writeln!(output, "results_url: {}", receipt.results_url)?;
    }
    output.flush()?;

    let handoff_path = args
        .handoff_path
        .clone()
        .unwrap_or_else(|| args.store.data_root.join("handoff").join("last_submission.json"));
    match write_json_pretty(&handoff_path, &receipt) {
        Ok(()) => info!(
            path = %handoff_path.display(),
            results_url = %receipt.results_url,
            "wrote submission hand-off"
        ),
        Err(err) => warn!(
            path = %handoff_path.display(),
            assessment_id = receipt.assessment_id,
            error = %format!("{err:#}"),
            "submission stored but hand-off file was not written"
        ),
    }

    Ok(ExitCode::SUCCESS)
}

/// Prints the user-facing message; the failure itself was logged where it
/// was detected.
fn report_failure(output: &mut impl Write, err: &LpaError) -> Result<ExitCode> {
    writeln!(output, "{}", err.user_message())?;
    output.flush()?;
    Ok(handled_failure())
}

fn read_entry(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read entry from stdin")?;
        return Ok(buf);
    }

    fs::read(path).with_context(|| format!("failed to read entry {}", path.display()))
}

/// Appends the `assessment` query parameter to the results page URL.
pub(super) fn results_url(base: &str, assessment_id: i64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}assessment={assessment_id}")
}
