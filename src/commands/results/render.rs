use std::io::Write;

use anyhow::{Context, Result};

use crate::model::{ResultScores, ResultsView};

struct MetricLine {
    label: &'static str,
    value: String,
}

fn metric_lines(results: &ResultScores) -> [MetricLine; 5] {
    let percent = |value: f64| format!("{value}%");
    [
        MetricLine {
            label: "Pipeline Health",
            value: percent(results.pipeline_health),
        },
        MetricLine {
            label: "Decision Index",
            value: percent(results.decision_index),
        },
        MetricLine {
            label: "Risk Level",
            value: format_thousands(results.risk_level.round() as i64),
        },
        MetricLine {
            label: "Growth Capacity",
            value: percent(results.growth_capacity),
        },
        MetricLine {
            label: "Leadership Density",
            value: percent(results.leadership_density),
        },
    ]
}

/// Integer with `,` thousands separators.
pub(super) fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub(super) fn write_json(output: &mut impl Write, view: &ResultsView) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, view)
        .context("failed to serialize results json output")?;
    writeln!(output)?;
    Ok(())
}

pub(super) fn write_text(output: &mut impl Write, view: &ResultsView) -> Result<()> {
    let respondent = &view.respondent;

    writeln!(output, "Leadership Pipeline Assessment Results")?;
    writeln!(output, "{} - {}", respondent.name, respondent.job_title)?;
    writeln!(output, "Assessment Date: {}", view.assessment_date)?;
    writeln!(
        output,
        "assessment_id={} entry_id={} company_size={} tech_team_size={} workforce_deployment={}",
        view.assessment_id,
        view.entry_id,
        respondent.company_size,
        respondent.tech_team_size,
        respondent.workforce_deployment,
    )?;

    for metric in metric_lines(&view.results) {
        writeln!(output, "\t{}: {}", metric.label, metric.value)?;
    }

    if !view.recommendations.is_empty() {
        writeln!(output, "Key Recommendations: {}", view.recommendations.len())?;
    }
    for (index, entry) in view.recommendations.iter().enumerate() {
        writeln!(
            output,
            "{}.\t[{}] {}",
            index + 1,
            entry.priority.label(),
            entry.title
        )?;
        if !entry.impact_description.is_empty() {
            writeln!(output, "\timpact: {}", entry.impact_description)?;
        }
        for (step_index, step) in entry.steps.iter().enumerate() {
            writeln!(output, "\tstep[{}]: {}", step_index + 1, step)?;
        }
    }

    Ok(())
}

/// Structural HTML fragment; every stored value is escaped.
pub(super) fn write_html(output: &mut impl Write, view: &ResultsView) -> Result<()> {
    let respondent = &view.respondent;

    writeln!(output, r#"<div class="lpa-results">"#)?;
    writeln!(output, r#"  <header class="lpa-results__header">"#)?;
    writeln!(output, "    <h1>Leadership Pipeline Assessment Results</h1>")?;
    writeln!(
        output,
        "    <p>{} - {}</p>",
        escape_html(&respondent.name),
        escape_html(&respondent.job_title)
    )?;
    writeln!(
        output,
        "    <p>Assessment Date: {}</p>",
        escape_html(&view.assessment_date)
    )?;
    writeln!(output, "  </header>")?;

    writeln!(output, r#"  <dl class="lpa-results__metrics">"#)?;
    for metric in metric_lines(&view.results) {
        writeln!(
            output,
            "    <dt>{}</dt><dd>{}</dd>",
            escape_html(metric.label),
            escape_html(&metric.value)
        )?;
    }
    writeln!(output, "  </dl>")?;

    if !view.recommendations.is_empty() {
        writeln!(output, r#"  <section class="lpa-results__recommendations">"#)?;
        writeln!(output, "    <h2>Key Recommendations</h2>")?;
        for entry in &view.recommendations {
            writeln!(
                output,
                r#"    <article class="lpa-priority-{}">"#,
                escape_html(entry.priority.as_str())
            )?;
            writeln!(
                output,
                "      <span>{}</span>",
                escape_html(&entry.priority.label())
            )?;
            writeln!(output, "      <h3>{}</h3>", escape_html(&entry.title))?;
            writeln!(
                output,
                "      <p>{}</p>",
                escape_html(&entry.impact_description)
            )?;
            if !entry.steps.is_empty() {
                writeln!(output, "      <ol>")?;
                for step in &entry.steps {
                    writeln!(output, "        <li>{}</li>", escape_html(step))?;
                }
                writeln!(output, "      </ol>")?;
            }
            writeln!(output, "    </article>")?;
        }
        writeln!(output, "  </section>")?;
    }

    writeln!(output, "</div>")?;
    Ok(())
}

pub(super) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}
