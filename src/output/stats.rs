//! Terminal statistics for a job report

use crate::jobs::JobReport;
use crate::state::SourceKind;

/// Prints a job's statistics to stdout in a formatted manner
pub fn print_statistics(report: &JobReport) {
    println!("=== Discovery Statistics ===\n");

    println!("Job:");
    println!("  Vendor: {}", report.vendor_name);
    println!("  Status: {}", report.status);
    println!("  Elapsed: {:.1}s", report.metrics.elapsed_secs);
    println!();

    let metrics = &report.metrics;
    println!("Pages:");
    println!("  Checked: {}", metrics.pages_checked);
    println!("  Failed: {}", metrics.failed_pages);
    println!("  Customer links found: {}", metrics.customer_links_found);
    println!();

    println!("Companies:");
    println!("  Found by sources: {}", metrics.companies_found);
    println!(
        "  Unique: {} (target {})",
        metrics.unique_companies, metrics.target_count
    );
    println!("  In final table: {}", report.results.len());
    println!();

    let by_source = source_breakdown(report);
    if !by_source.is_empty() {
        println!("Unique Companies by Source:");
        for (source, count) in by_source {
            println!("  {}: {}", source, count);
        }
        println!();
    }

    if let Some(error) = &report.error_details {
        println!("Failure ({}):", error.error_type);
        for reason in &error.reasons {
            println!("  - {}", reason);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched successfully)",
        metrics.success_rate(),
        metrics.valid_pages,
        metrics.pages_checked
    );
}

/// Partial-result counts per source kind, largest first
fn source_breakdown(report: &JobReport) -> Vec<(SourceKind, usize)> {
    let mut counts: Vec<(SourceKind, usize)> = Vec::new();
    for entry in report.partial_results.iter() {
        match counts.iter_mut().find(|(kind, _)| *kind == entry.source) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.source, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
