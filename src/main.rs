//! Flight Delays - prints the flight-delay dashboard tables for a directory of
//! yearly CSV files.

use anyhow::Context;
use clap::Parser;
use flight_delays::cli::Cli;
use flight_delays::logging::init_logging;
use flight_delays::DashboardApp;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = cli.resolve_config().context("Failed to load configuration")?;
    let mut app = DashboardApp::new(config);

    app.load().context("Failed to load flight data")?;

    let stdout = std::io::stdout();
    app.render_report(&mut stdout.lock())
        .context("Failed to render report")?;

    Ok(())
}
