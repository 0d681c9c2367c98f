//! Step-timing benchmark CLI
//!
//! Runs the built-in suites and prints one report per step.

use clap::Parser;
use step_timing::{report, workloads, Cli, HarnessConfig, Host, SuiteDriver};

fn init_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    let config = cli.apply(config);
    config.validate()?;

    let host = Host::new(config.event_loop_config()?);
    let suites = workloads::create_suites(host.event_loop());
    let mut driver = SuiteDriver::new(host.clone(), config.params.clone())
        .with_iterations(config.iterations)
        .with_step_timeout(config.step_timeout()?);
    if let Some(kind) = config.runner_kind()? {
        driver = driver.with_runner_kind(kind);
    }

    let reports = match driver.run_suites(&suites) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.json {
        println!("{}", report::format_results_json(&reports)?);
    } else {
        println!("{}", report::format_results(&reports));

        let total_sync: f64 = reports.iter().map(|r| r.sync_duration_ms).sum();
        let total_async: f64 = reports.iter().map(|r| r.async_duration_ms).sum();
        println!("Summary:");
        println!("  Steps reported: {}", reports.len());
        println!("  Total sync: {:.2} ms", total_sync);
        println!("  Total async: {:.2} ms", total_async);
    }

    if cli.trace && cli.json {
        eprintln!("{}", serde_json::to_string_pretty(&host.performance().entries())?);
    } else if cli.trace {
        for entry in host.performance().entries() {
            eprintln!(
                "{:<8} {:<40} {:>10.3} {:>10.3}",
                format!("{:?}", entry.entry_type).to_lowercase(),
                entry.name,
                entry.start_time,
                entry.duration
            );
        }
    }

    Ok(())
}
