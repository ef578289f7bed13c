use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use sessionvault_backend::{
    config::Settings, AuthError, AuthService, FlatFileUserStore, SessionManager,
};
use sessionvault_common::NewUser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Operator CLI for the session-credential store
#[derive(Parser, Debug)]
#[command(name = "sessionvault", version, about)]
struct Cli {
    /// Configuration file (defaults to ./sessionvault.toml when present)
    #[arg(long, global = true, env = "SESSIONVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new user account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, env = "SESSIONVAULT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in with a username or email
    Login {
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "SESSIONVAULT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Trade the live renewal token for a fresh pair
    Renew {
        #[arg(long, env = "SESSIONVAULT_RENEWAL_TOKEN", hide_env_values = true)]
        renewal_token: String,
    },
    /// End the session of the access token's owner
    Logout {
        #[arg(long, env = "SESSIONVAULT_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },
    /// Change the password of the access token's owner
    ChangePassword {
        #[arg(long, env = "SESSIONVAULT_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
    },
    /// Show the user an access token belongs to
    Whoami {
        #[arg(long, env = "SESSIONVAULT_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err:#}");
            return ExitCode::from(2);
        },
    };
    init_tracing(&settings);

    let service = match build_service(&settings) {
        Ok(service) => service,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "startup failed");
            eprintln!("startup failed: {err:#}");
            return ExitCode::from(2);
        },
    };

    match run(cli.command, service.as_ref()).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        },
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        },
    }
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.validate()?;
    Ok(settings)
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if settings.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_service(settings: &Settings) -> anyhow::Result<Arc<dyn AuthService>> {
    let store = FlatFileUserStore::new(&settings.storage.path).with_context(|| {
        format!("opening user store at {}", settings.storage.path.display())
    })?;
    let manager = SessionManager::from_settings(settings, Arc::new(store))?;
    tracing::info!(path = %settings.storage.path.display(), "user store ready");
    Ok(Arc::new(manager))
}

async fn run(command: Command, service: &dyn AuthService) -> anyhow::Result<Value> {
    let output = match command {
        Command::Register {
            username,
            email,
            full_name,
            password,
        } => {
            let user = service
                .register(NewUser {
                    username,
                    email,
                    full_name,
                    password,
                })
                .await?;
            serde_json::to_value(user)?
        },
        Command::Login {
            identifier,
            password,
        } => serde_json::to_value(service.login(&identifier, &password).await?)?,
        Command::Renew { renewal_token } => {
            serde_json::to_value(service.renew(&renewal_token).await?)?
        },
        Command::Logout { access_token } => {
            let user_id = service.verify_access_token(&access_token)?;
            service.logout(&user_id).await?;
            json!({ "logged_out": user_id })
        },
        Command::ChangePassword {
            access_token,
            old_password,
            new_password,
        } => {
            let user_id = service.verify_access_token(&access_token)?;
            service
                .change_password(&user_id, &old_password, &new_password)
                .await?;
            json!({ "password_changed": user_id })
        },
        Command::Whoami { access_token } => {
            serde_json::to_value(service.current_user(&access_token).await?)?
        },
    };
    Ok(output)
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<AuthError>() {
        Some(auth) => {
            tracing::debug!(code = auth.error_code(), error = %auth, "command failed");
            eprintln!("error [{}]: {}", auth.error_code(), auth.sanitized_message());
        },
        None => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
        },
    }
}
