//! Command dispatch

use std::io::Write;
use std::path::Path;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::AssignOutcome;
use crate::cli::args::Cli;
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::{Scope, TaskArena};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeNodeConvert;

/// Run the command described by `cli`.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if cli.show_config {
        let settings = load_settings(cli)?;
        output::info(&settings.to_toml()?);
        return Ok(());
    }

    match cli.input.as_deref() {
        Some(input) => assign(cli, input),
        None => print_usage(),
    }
}

fn print_usage() -> CliResult<()> {
    Cli::command()
        .print_help()
        .map_err(|e| InfraError::io("print usage", e))?;
    Ok(())
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.per_sheet {
        settings.scope = Scope::Sheet;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(cli))]
fn assign(cli: &Cli, input: &Path) -> CliResult<()> {
    if cli.dry_run && cli.output.is_some() {
        return Err(CliError::InvalidArgs(
            "--output cannot be combined with --dry-run".to_string(),
        ));
    }

    let container = ServiceContainer::new(load_settings(cli)?);
    let service = container.assign_service();
    let outcome = service.run(input, cli.output.as_deref(), cli.dry_run)?;

    if cli.tree {
        print_tree(&outcome)?;
    }
    if outcome.report.unassigned > 0 {
        output::warning(&format!(
            "{} leaves have no budget owner and no default time",
            outcome.report.unassigned
        ));
    }
    match &outcome.output {
        Some(path) => output::success(&format!("done: {}", path.display())),
        None => output::success("done (dry run, nothing written)"),
    }
    output::detail(&outcome.report);
    Ok(())
}

fn print_tree(outcome: &AssignOutcome) -> CliResult<()> {
    let arena = TaskArena::from_tree(outcome.root.clone());
    output::header("Assigned tree");
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", arena.to_tree_string())
        .map_err(|e| InfraError::io("print tree", e))?;
    Ok(())
}
