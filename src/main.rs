use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cfpa_gate::auth::{TokenGenerator, issue_token};
use cfpa_gate::config::{DEFAULT_LOG_FILTER, ServerConfig};
use cfpa_gate::permissions::{PermissionRegistry, grant_all, seed_user_grants};
use cfpa_gate::server::{AppState, create_router};
use cfpa_gate::store::{SqliteStore, Store};
use cfpa_gate::types::{Role, User, VocationalCenter};

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "cfpa-gate")]
#[command(about = "Permission and tenant-isolation server for vocational centers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags and environment variables override it
        #[arg(long, env = "CFPA_CONFIG")]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long, env = "CFPA_HOST")]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short, env = "CFPA_PORT")]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long, env = "CFPA_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Log filter used when RUST_LOG is unset
        #[arg(long, env = "CFPA_LOG")]
        log_filter: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and founder account)
    Init {
        /// Data directory for the database
        #[arg(long, env = "CFPA_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Username of the founder account
        #[arg(long, default_value = "founder")]
        username: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Allow every catalog permission for a user
    GrantAll {
        /// Data directory for the database
        #[arg(long, env = "CFPA_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Account to grant permissions to
        #[arg(long)]
        username: String,
    },
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())
        .with_context(|| format!("failed to open database in {}", data_dir.display()))?;
    store.initialize()?;
    Ok(store)
}

fn run_init(data_dir: PathBuf, username: String, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;
    let store = open_store(&data_dir)?;

    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    let token_file = config.token_file();

    if store.has_founder()? {
        bail!(
            "Server already initialized. Founder token exists at: {}",
            token_file.display()
        );
    }

    let now = Utc::now();
    let founder = User {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        role: Role::Founder,
        center_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&founder)?;

    let registry = PermissionRegistry::builtin();
    let diff = seed_user_grants(&store, &registry, &founder)?;
    info!(user_id = %founder.id, granted = diff.resulting_len(), "created founder account");

    let (_, raw_token) = issue_token(&store, &TokenGenerator::new(), &founder.id, None)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Founder '{username}' token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_first_center_prompt(&store)?;
    }

    Ok(())
}

fn create_first_center_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_center = inquire::Confirm::new("Would you like to create the first center?")
        .with_default(true)
        .prompt()?;

    if !create_center {
        return Ok(());
    }

    let code = inquire::Text::new("Center code:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Code cannot be empty".into())
            } else if input.contains(char::is_whitespace) {
                Err("Code cannot contain whitespace".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let name = inquire::Text::new("Center name:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Name cannot be empty".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let center = VocationalCenter {
        id: Uuid::new_v4().to_string(),
        code: code.trim().to_string(),
        name: name.trim().to_string(),
        is_active: true,
        created_at: Utc::now(),
    };
    store.create_center(&center)?;

    println!();
    println!("Created center '{}' ({})", center.name, center.id);
    println!();

    Ok(())
}

fn run_grant_all(data_dir: PathBuf, username: String) -> anyhow::Result<()> {
    let store = open_store(&data_dir)?;

    let Some(user) = store.get_user_by_username(&username)? else {
        bail!("No user named '{username}'");
    };

    let registry = PermissionRegistry::builtin();
    let report = grant_all(&store, &registry, &user.id)?;

    println!(
        "Granted all {} permissions to '{}' ({} added, {} updated)",
        registry.len(),
        user.username,
        report.added,
        report.updated
    );

    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    log_filter: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut cfg = match config {
        Some(path) => ServerConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(host) = host {
        cfg.host = host;
    }
    if let Some(port) = port {
        cfg.port = port;
    }
    if let Some(data_dir) = data_dir {
        cfg.data_dir = data_dir;
    }
    if let Some(log_filter) = log_filter {
        cfg.log_filter = log_filter;
    }

    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => {
            init_tracing(DEFAULT_LOG_FILTER)?;
            match command {
                AdminCommands::Init {
                    data_dir,
                    username,
                    non_interactive,
                } => {
                    run_init(data_dir, username, non_interactive)?;
                }
                AdminCommands::GrantAll { data_dir, username } => {
                    run_grant_all(data_dir, username)?;
                }
            }
        }
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            log_filter,
        } => {
            let config = load_config(config, host, port, data_dir, log_filter)?;
            init_tracing(&config.log_filter)?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.has_founder()? {
                bail!(
                    "Server not initialized. Run 'cfpa-gate admin init' first to create the founder account."
                );
            }

            let state = Arc::new(AppState::new(Arc::new(store)));
            info!(permissions = state.registry.len(), "loaded permission catalog");

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
