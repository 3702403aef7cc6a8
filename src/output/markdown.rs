//! Markdown report generation
//!
//! Renders a job report as a human-readable document: the customer table,
//! then run information, validation buckets and the tail of the job log.

use crate::jobs::JobReport;
use crate::state::GroupValidation;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Log entries included at the end of the report
const LOG_TAIL: usize = 20;

/// Writes the markdown report for `report` to `output_path`
pub fn write_markdown_report(report: &JobReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a job report as markdown
pub fn format_markdown_report(report: &JobReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Customers of {}\n\n", report.vendor_name));

    // Customer table
    if report.results.is_empty() {
        md.push_str("No customers found.\n\n");
    } else {
        md.push_str("| Competitor | Customer | URL |\n");
        md.push_str("|------------|----------|-----|\n");
        for row in &report.results {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&row.competitor),
                escape_cell(&row.customer_name),
                escape_cell(&row.customer_url)
            ));
        }
        md.push('\n');
    }

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", report.job_id));
    md.push_str(&format!("- **Status**: {}\n", report.status));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.metrics.elapsed_secs
    ));
    md.push_str(&format!("- **Requested**: {}\n\n", report.max_results));

    // Counters
    md.push_str("## Statistics\n\n");
    md.push_str(&format!("- **Pages Checked**: {}\n", report.metrics.pages_checked));
    md.push_str(&format!("- **Failed Pages**: {}\n", report.metrics.failed_pages));
    md.push_str(&format!(
        "- **Customer Links Found**: {}\n",
        report.metrics.customer_links_found
    ));
    md.push_str(&format!(
        "- **Unique Companies**: {}\n",
        report.metrics.unique_companies
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.metrics.success_rate()
    ));

    // Validation buckets
    let validation = &report.validation_status;
    md.push_str("## Validation\n\n");
    md.push_str("| Group | Status | Valid Records |\n");
    md.push_str("|-------|--------|---------------|\n");
    for (label, group) in [
        ("Vendor site", validation.vendor_site),
        ("Featured customers", validation.featured_customers),
        ("Search engines", validation.search_engines),
        ("Combined", validation.combined),
    ] {
        md.push_str(&group_row(label, group));
    }
    md.push('\n');

    if let Some(error) = &report.error_details {
        md.push_str(&format!("## Failure: {}\n\n", error.error_type));
        for reason in &error.reasons {
            md.push_str(&format!("- {}\n", reason));
        }
        md.push('\n');
    }

    if !report.logs.is_empty() {
        md.push_str("## Log\n\n");
        let skip = report.logs.len().saturating_sub(LOG_TAIL);
        for entry in report.logs.iter().skip(skip) {
            md.push_str(&format!(
                "- `{}` **{:?}** {}\n",
                entry.timestamp.format("%H:%M:%S"),
                entry.level,
                entry.message
            ));
        }
        md.push('\n');
    }

    md
}

fn group_row(label: &str, group: GroupValidation) -> String {
    let status = serde_json::to_value(group.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    format!("| {} | {} | {} |\n", label, status, group.count)
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{ErrorDetails, JobStore, ProgressEvent};
    use crate::state::JobStatus;
    use crate::summarize::TableRow;

    fn finished_report(results: Vec<TableRow>, error: Option<ErrorDetails>) -> JobReport {
        let store = JobStore::new(50);
        let id = store.create("Acme", 10);
        let status = if error.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        store.update(&id, |job| {
            job.apply(ProgressEvent::Finished {
                status,
                results,
                error,
            })
        });
        store.report(&id).unwrap()
    }

    #[test]
    fn test_format_markdown_report() {
        let report = finished_report(
            vec![TableRow {
                competitor: "Acme".to_string(),
                customer_name: "Globex | Labs".to_string(),
                customer_url: "globex.com".to_string(),
            }],
            None,
        );
        let markdown = format_markdown_report(&report);

        assert!(markdown.contains("# Customers of Acme"));
        assert!(markdown.contains("| Acme | Globex \\| Labs | globex.com |"));
        assert!(markdown.contains("Run Information"));
        assert!(markdown.contains("| Combined | pending | 0 |"));
        assert!(!markdown.contains("## Failure"));
    }

    #[test]
    fn test_markdown_reports_failure() {
        let report = finished_report(
            Vec::new(),
            Some(ErrorDetails::new(
                "validation_error",
                vec!["Insufficient structurally valid records: 1/3 required".to_string()],
            )),
        );
        let markdown = format_markdown_report(&report);

        assert!(markdown.contains("No customers found."));
        assert!(markdown.contains("## Failure: validation_error"));
        assert!(markdown.contains("- Insufficient structurally valid records: 1/3 required"));
    }

    #[test]
    fn test_write_markdown_report() {
        let report = finished_report(Vec::new(), None);
        let file = tempfile::NamedTempFile::new().unwrap();

        write_markdown_report(&report, file.path()).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.starts_with("# Customers of Acme"));
    }
}
