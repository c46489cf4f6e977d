use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::{admin_roles, permission, role_definition, PERMISSIONS, ROLES};
use crate::config::GateConfig;
use crate::editor::MatrixEditor;
use crate::evaluator::Authorizer;
use crate::matrix::load_matrix;
use crate::role::{AdminRole, UserRole};
use crate::session::{Navigator, RoleChange, Session};
use crate::store::{PersistedStore, SledStore, MATRIX_KEY};

/// Top-level CLI interface for rolegate
#[derive(Parser)]
#[command(
    name = "rolegate",
    version,
    about = "Role-based gating for admin panels and routes"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./rolegate.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP front-end with the edge gate in place
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Display the persisted role
    Whoami,

    /// Change the persisted role
    SetRole {
        role: String,
        /// Path of the view the change is made from
        #[arg(long, default_value = "/")]
        location: String,
    },

    /// Evaluate a permission for a role (persisted role if omitted)
    Check {
        permission: String,
        #[arg(long)]
        role: Option<String>,
    },

    /// List role definitions
    Roles,

    /// Inspect or edit the permission matrix override
    Matrix {
        #[command(subcommand)]
        command: MatrixCommand,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum MatrixCommand {
    /// Print the effective matrix
    Show,
    /// Set one cell and save
    Toggle {
        permission: String,
        role: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Drop the override and fall back to the compiled default
    Reset,
}

/// Prints instead of navigating; there is no view to discard on a terminal.
struct TerminalNavigator {
    location: String,
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.location.clone()
    }

    fn navigate_full(&self, path: &str) {
        println!("-> navigate to {path}");
    }
}

fn open_store(config: &GateConfig) -> anyhow::Result<SledStore> {
    SledStore::open(&config.store_path)
        .with_context(|| format!("failed to open store at {}", config.store_path))
}

fn hydrated_session(config: &GateConfig, store: &SledStore) -> anyhow::Result<Session> {
    let session = Session::new(config.session_policy());
    session.hydrate(Some(store))?;
    Ok(session)
}

pub async fn dispatch(cli: Cli, mut config: GateConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::web::serve(config).await?;
        }
        Commands::Whoami => {
            let store = open_store(&config)?;
            let session = hydrated_session(&config, &store)?;
            let role = session.current_role();
            match role_definition(role) {
                Some(def) => println!("{} ({role}) - {}", def.name, def.description),
                None => println!("{role}"),
            }
        }
        Commands::SetRole { role, location } => {
            let new_role: UserRole = role.parse()?;
            let store = open_store(&config)?;
            let session = hydrated_session(&config, &store)?;
            let navigator = TerminalNavigator { location };
            match session.set_role(new_role, &store, &navigator)? {
                RoleChange::Updated { from, to } => println!("role changed: {from} -> {to}"),
                RoleChange::Redirected { to, location } => {
                    println!("role changed to {to}; left protected area for {location}")
                }
            }
        }
        Commands::Check { permission: key, role } => {
            if permission(&key).is_none() {
                anyhow::bail!("unknown permission: {key}");
            }
            let store = open_store(&config)?;
            let role = match role {
                Some(role) => role.parse::<UserRole>()?,
                None => hydrated_session(&config, &store)?.current_role(),
            };
            let allowed = Authorizer::new(&store).has_permission(role, &key);
            println!("{role} {key}: {}", if allowed { "allowed" } else { "denied" });
        }
        Commands::Roles => {
            for def in ROLES {
                let class = if def.is_admin { "admin" } else { "public" };
                println!("{:<11} {:<12} [{class}] {}", def.role, def.name, def.description);
            }
        }
        Commands::Matrix { command } => matrix_command(command, &config).await?,
        Commands::Config => print!("{}", config.to_toml()?),
    }
    Ok(())
}

async fn matrix_command(command: MatrixCommand, config: &GateConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    match command {
        MatrixCommand::Show => {
            let matrix = load_matrix(&store);
            let roles = admin_roles();
            println!(
                "{:<20} {:>8} {:>8} {:>11}",
                "permission", roles[0], roles[1], roles[2]
            );
            for p in PERMISSIONS {
                let cell = |role: AdminRole| if matrix.granted(p.key, role) { "x" } else { "-" };
                println!(
                    "{:<20} {:>8} {:>8} {:>11}",
                    p.key,
                    cell(roles[0]),
                    cell(roles[1]),
                    cell(roles[2])
                );
            }
        }
        MatrixCommand::Toggle {
            permission: key,
            role,
            enabled,
        } => {
            if permission(&key).is_none() {
                anyhow::bail!("unknown permission: {key}");
            }
            let role: AdminRole = role.parse()?;
            let mut editor = MatrixEditor::open(&store, config.cookie_options());
            editor.toggle(&key, role, enabled)?;
            editor.save(config.save_latency()).await?;
            println!("{key} for {role}: {enabled}");
        }
        MatrixCommand::Reset => {
            store.remove(MATRIX_KEY)?;
            println!("permission matrix reset to defaults");
        }
    }
    Ok(())
}
