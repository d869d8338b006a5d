//! Command dispatch: build the cluster from settings, then run one query

use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::{MembershipService, PlacementService};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{expand_path, global_config_path, Settings};
use crate::domain::NetworkTopology;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            print_completions(*shell);
            Ok(())
        }
        Some(Commands::Config { command }) => run_config(cli, command),
        Some(command) => {
            let settings = load_settings(cli)?;
            let membership = build_cluster(&settings)?;
            run_query(&membership, command)
        }
        None => Err(CliError::Usage(
            "no command given, see `racktopo --help`".to_string(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let cluster_file = cli
        .config
        .as_ref()
        .map(|p| expand_path(&p.to_string_lossy()));
    debug!("cluster_file: {:?}", cluster_file);
    Ok(Settings::load(cluster_file.as_deref())?)
}

/// Join every configured node into a fresh topology.
pub fn build_cluster(settings: &Settings) -> CliResult<MembershipService> {
    let topology = Arc::new(NetworkTopology::new());
    Ok(MembershipService::bootstrap(topology, settings)?)
}

#[instrument(level = "debug", skip(membership))]
fn run_query(membership: &MembershipService, command: &Commands) -> CliResult<()> {
    let topology = membership.topology();
    match command {
        Commands::Tree => output::info(&topology.to_tree()),
        Commands::Leaves { scope } => {
            for leaf in topology.get_leaves(scope) {
                output::info(&leaf.path());
            }
        }
        Commands::Choose { scope } => {
            let leaf = topology.choose_random(scope).map_err(ApplicationError::from)?;
            output::info(&leaf.path());
        }
        Commands::Racks => {
            for rack in topology.racks() {
                output::info(&rack);
            }
        }
        Commands::Summary => output::info(&topology.to_string().trim_end()),
        Commands::Ensemble { size, exclude } => {
            let excluded = exclude
                .iter()
                .map(|id| {
                    membership
                        .member(id)
                        .ok_or_else(|| ApplicationError::UnknownNode(id.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let placement = PlacementService::new(Arc::clone(topology));
            let ensemble = placement.new_ensemble(*size, &excluded)?;
            output::header(&format!("Ensemble of {}", ensemble.len()));
            for leaf in ensemble {
                output::success_detail(&leaf.path());
            }
        }
        Commands::Config { .. } | Commands::Completion { .. } => {
            return Err(CliError::InvalidArgs(
                "command does not query the topology".to_string(),
            ))
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            if let Some(path) = &cli.config {
                output::action("cluster", &expand_path(&path.to_string_lossy()).display());
            }
        }
    }
    Ok(())
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
