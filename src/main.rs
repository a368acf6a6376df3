use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use crate::commands::command_definitions;
use crate::config::load_config;
use crate::discord::DiscordApiClient;
use crate::github::GithubApiClient;
use crate::openai::OpenAIApiClient;
use crate::polling::PollingService;
use crate::repository::fetch_repository_info;
use crate::server::{parse_public_key, ServerState};
use crate::state::BotState;
use tracing_subscriber::EnvFilter;
use tracing::{error, info, warn};

mod commands;
mod config;
mod context;
mod delivery;
mod discord;
mod github;
mod handlers;
mod intent;
mod models;
mod openai;
mod polling;
mod repository;
mod server;
mod state;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<()> {
    // Load Configuration
    let app_settings = load_config()
        .with_context(|| "Failed to load configuration")?;

    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&app_settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting application with log level {}...", app_settings.log_level);
    let settings = Arc::new(app_settings);

    let discord_client = DiscordApiClient::new(&settings)
        .with_context(|| "Failed to create Discord client")?;
    let github_client = GithubApiClient::new(&settings)
        .with_context(|| "Failed to create GitHub client")?;
    let openai_client = OpenAIApiClient::new(&settings)
        .with_context(|| "Failed to create OpenAI client")?;

    let bot_user = discord_client
        .current_user()
        .await
        .with_context(|| "Failed to authenticate with Discord")?;
    info!("{} est en ligne !", bot_user.username);

    let discord_client = Arc::new(discord_client);
    let github_client = Arc::new(github_client);

    let state = Arc::new(BotState::new(
        settings.clone(),
        discord_client.clone(),
        github_client.clone(),
        Arc::new(openai_client),
        bot_user,
    ));

    // A missing snapshot only degrades prompts; commands fall back to the configured branch
    match fetch_repository_info(&github_client).await {
        Ok(info) => {
            state.set_repo_info(info).await;
            info!("Contexte GitHub chargé avec succès");
        }
        Err(e) => error!("Erreur lors du chargement du contexte GitHub: {}", e),
    }

    if settings.register_commands {
        match discord_client.register_commands(&command_definitions()).await {
            Ok(()) => info!("Commandes slash enregistrées avec succès!"),
            Err(e) => error!("Erreur lors de l'enregistrement des commandes slash: {}", e),
        }
    }

    let verifying_key = if settings.discord_public_key.is_empty() {
        warn!("GITBOT_DISCORD_PUBLIC_KEY is not set; slash commands will be rejected");
        None
    } else {
        Some(parse_public_key(&settings.discord_public_key).map_err(|e| anyhow!(e))?)
    };
    let server_state = Arc::new(ServerState {
        bot: state.clone(),
        verifying_key,
    });

    let polling_service = PollingService::new(state);
    info!(
        "Starting polling service with interval of {} seconds...",
        settings.poll_interval_seconds
    );

    // Both run indefinitely; the first to fail stops the process
    tokio::select! {
        result = polling_service.start_polling() => result,
        result = server::serve(server_state, settings.port) => result,
    }
}
