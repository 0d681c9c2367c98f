//! Report formatting.

use crate::driver::StepReport;

/// Format step reports as a table
pub fn format_results(reports: &[StepReport]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{:<35} {:>5} {:>13} {:>13} {:>13}\n",
        "Step", "Iter", "Sync (ms)", "Async (ms)", "Total (ms)"
    ));
    output.push_str(&format!("{}\n", "=".repeat(83)));

    for report in reports {
        let name = format!("{}.{}", report.suite, report.step);
        output.push_str(&format!(
            "{:<35} {:>5} {:>13.2} {:>13.2} {:>13.2}\n",
            name,
            report.iteration,
            report.sync_duration_ms,
            report.async_duration_ms,
            report.total_ms()
        ));
    }

    output
}

/// Format step reports as JSON
pub fn format_results_json(reports: &[StepReport]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(reports)
}
