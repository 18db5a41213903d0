use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::FieldsArgs;
use crate::field_map::load_field_map;

pub fn run(args: FieldsArgs) -> Result<ExitCode> {
    let field_map = load_field_map(args.field_map_path.as_deref())?;

    let source = args
        .field_map_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    info!(source = %source, version = field_map.version, "field map valid");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &field_map)
            .context("failed to serialize field map")?;
        writeln!(output)?;
    } else {
        writeln!(output, "Field map v{} ({source})", field_map.version)?;
        writeln!(output, "\tentry_id\t{}", field_map.entry_id)?;
        for (attribute, identifier) in field_map.field_bindings() {
            writeln!(output, "\t{attribute}\t{identifier}")?;
        }
    }
    output.flush()?;

    Ok(ExitCode::SUCCESS)
}
