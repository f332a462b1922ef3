use anyhow::Result;
use clap::Parser;
use gmail_agent::auth::Authenticator;
use gmail_agent::cli::{self, Cli, Commands};
use gmail_agent::client::HttpGmailApi;
use gmail_agent::config::CredentialPaths;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        eprintln!("\nFor help, run: gmail-agent --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with level based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gmail_agent=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gmail_agent=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let auth = Authenticator::new(CredentialPaths::new()?);

    match cli.command {
        Commands::Setup { json } => cli::cmd_setup(&auth, json).await?,
        Commands::Auth { manual } => cli::cmd_auth(&auth, manual).await?,
        Commands::Scope { set } => cli::cmd_scope(&auth, set.as_deref()).await?,
        command => {
            // Every other command needs a usable token first.
            let token = auth.acquire(false).await?;
            let api = HttpGmailApi::new(token.access_token);

            match command {
                Commands::Search(args) => cli::cmd_search(&api, &args).await?,
                Commands::Download(args) => cli::cmd_download(&api, &args).await?,
                Commands::Labels { json } => cli::cmd_labels(&api, json).await?,
                Commands::Send(args) => cli::cmd_send(&api, &args).await?,
                Commands::Draft(args) => cli::cmd_draft(&api, &args).await?,
                Commands::Reply(args) => cli::cmd_reply(&api, &args).await?,
                Commands::Setup { .. } | Commands::Auth { .. } | Commands::Scope { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }

    Ok(())
}
