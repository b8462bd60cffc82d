use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use permit_core::CompanyId;
use permit_core::telemetry::init_tracing;
use permit_daemon::{ServerBuilder, Settings, server};
use permit_http::services::TokenSubject;
use std::path::PathBuf;
use tracing::info;

/// Permit - company feature entitlements
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a signed bearer token
    Token {
        /// Subject (user id)
        #[arg(long)]
        user: String,
        /// Company the token acts for
        #[arg(long)]
        company: Option<CompanyId>,
        /// Role to embed; repeat for several
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::load().context("Failed to load configuration")?,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Token {
            user,
            company,
            roles,
            name,
        } => {
            let token = server::jwt_service(&settings).generate_token(&TokenSubject {
                user_id: &user,
                name: name.as_deref(),
                company_id: company,
                roles: &roles,
            })?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> Result<()> {
    init_tracing(&settings.logging)?;

    let address = settings.server.address();
    let (app, _state) = ServerBuilder::connect(settings).await?.build().await?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    println!("Server running at: http://{}/", listener.local_addr()?);

    server::serve(listener, app, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
    })
    .await?;

    Ok(())
}
