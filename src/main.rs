use anyhow::Context;
use clap::Parser;
use console::style;
use dropmirror::commands::mirror;
use dropmirror::config::Cli;
use dropmirror::Settings;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Settings are validated before anything touches the network or disk
    let settings = Settings::load(&cli).context("could not load settings")?;

    let report = mirror::run(&settings, cli.verbose);

    match &report.error {
        None => {
            let label = if settings.dry_run {
                "Dry run complete:"
            } else if report.summary.has_changes() {
                "Mirror updated:"
            } else {
                "Mirror already up to date:"
            };
            eprintln!("{} {}", style(label).green().bold(), report.summary);
        }
        Some(err) => {
            eprintln!(
                "{} {} (state: {})",
                style("Run failed:").red().bold(),
                err,
                report.state
            );
        }
    }

    Ok(ExitCode::from(report.exit_code()))
}
