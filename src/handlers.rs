use crate::commands::SlashCommand;
use crate::context::{
    assemble_conversation, chat_persona, commit_not_found_context, commit_summary_prompt,
    found_commit_context, history_to_conversation, latest_commit_context, sanitize_name,
    sha_commit_context,
};
use crate::delivery::{chunk_text, format_file_content, TypingIndicator, MESSAGE_CHUNK_SIZE};
use crate::discord::{MessageQuery, MESSAGE_CHAR_LIMIT};
use crate::intent::{extract_intents, GitIntent};
use crate::models::{
    CommitRecord, ConversationMessage, DiscordMessage, Interaction, RepositoryInfo,
    DISPLAY_DATE_FORMAT,
};
use crate::repository::RepositoryService;
use crate::state::BotState;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const UNKNOWN_COMMAND_REPLY: &str = "Commande inconnue ou incomplète.";

fn fit_message(text: &str) -> String {
    text.chars().take(MESSAGE_CHAR_LIMIT).collect()
}

/// Looks up every requested commit. Failed lookups are logged and skipped.
pub(crate) async fn gather_git_context(
    repository: &RepositoryService,
    intents: &[GitIntent],
) -> Vec<ConversationMessage> {
    let mut context = Vec::new();
    for intent in intents {
        match intent {
            GitIntent::LatestCommit { branch } => {
                match repository.latest_commit(branch.as_deref()).await {
                    Ok(Some(commit)) => context.push(latest_commit_context(&commit, branch.as_deref())),
                    Ok(None) => info!(
                        "No commit found on branch {}",
                        repository.resolve_branch(branch.as_deref())
                    ),
                    Err(e) => warn!("Failed to fetch latest commit: {}", e),
                }
            }
            GitIntent::SpecificCommit { query, branch } => {
                match repository
                    .find_commit_by_substring(query, branch.as_deref())
                    .await
                {
                    Ok(Some(commit)) => context.push(found_commit_context(&commit, branch.as_deref())),
                    Ok(None) => context.push(commit_not_found_context(query, branch.as_deref())),
                    Err(e) => warn!("Failed to search commit {:?}: {}", query, e),
                }
            }
            GitIntent::ShaLookup { sha } => match repository.commit_details(sha).await {
                Ok(commit) => context.push(sha_commit_context(&commit)),
                Err(e) => warn!("Failed to fetch commit {}: {}", sha, e),
            },
            GitIntent::UnresolvedCommit => {
                debug!("Commit request without an identifiable commit, skipping lookup");
            }
        }
    }
    context
}

async fn build_chat_reply(state: &BotState, message: &DiscordMessage) -> Result<String> {
    let repo_info = state.repo_info().await;
    let repository = state.repository(repo_info.as_deref());

    let persona = chat_persona(&state.bot_user.username, &state.settings, repo_info.as_deref());

    let intents = extract_intents(&message.content);
    debug!(?intents, "Extracted intents");
    let git_context = gather_git_context(&repository, &intents).await;

    let query = MessageQuery::before(&message.id, state.settings.history_limit);
    let history = match state.platform.fetch_messages(&message.channel_id, &query).await {
        Ok(messages) => {
            history_to_conversation(messages, &state.bot_user, &state.settings.ignore_prefix)
        }
        Err(e) => {
            warn!(
                channel_id = %message.channel_id,
                "Failed to fetch channel history, continuing without it: {}", e
            );
            Vec::new()
        }
    };

    let current = ConversationMessage::user(
        sanitize_name(&message.author.username),
        message.content.clone(),
    );
    let conversation = assemble_conversation(persona, git_context, history, current);
    debug!("Sending conversation of {} messages", conversation.len());

    Ok(state.openai.complete(conversation).await?)
}

/// Answers a channel message. Errors are reported in the channel, never propagated
/// to other pipelines.
pub async fn handle_message(state: Arc<BotState>, message: DiscordMessage) -> Result<()> {
    if message.author.bot {
        debug!(message_id = %message.id, "Ignoring message from a bot");
        return Ok(());
    }
    if message.content.starts_with(&state.settings.ignore_prefix) || message.content.trim().is_empty() {
        debug!(message_id = %message.id, "Ignoring message");
        return Ok(());
    }

    info!(
        "Processing message {} from {} in channel {}",
        message.id, message.author.username, message.channel_id
    );

    let typing = TypingIndicator::start(
        state.platform.clone(),
        &message.channel_id,
        state.typing_interval(),
    );
    let outcome = build_chat_reply(&state, &message).await;
    typing.stop().await;

    match outcome {
        Ok(reply) => {
            for chunk in chunk_text(&reply, MESSAGE_CHUNK_SIZE) {
                reply_with_fallback(&state, &message, &chunk).await?;
            }
            info!("Replied to message {}", message.id);
            Ok(())
        }
        Err(e) => {
            error!("Erreur lors du traitement du message {}: {:#}", message.id, e);
            let text = fit_message(&format!("Désolé, une erreur s'est produite: {:#}", e));
            reply_with_fallback(&state, &message, &text).await
        }
    }
}

async fn reply_with_fallback(state: &BotState, message: &DiscordMessage, content: &str) -> Result<()> {
    let platform = &state.platform;
    match platform.reply(&message.channel_id, &message.id, content).await {
        Ok(()) => Ok(()),
        Err(reply_err) => {
            warn!("Reply failed ({}), sending to channel instead", reply_err);
            platform
                .send_message(&message.channel_id, content)
                .await
                .map_err(|e| {
                    error!("Failed to deliver message in channel {}: {}", message.channel_id, e);
                    anyhow!("Failed to deliver message: {}", e)
                })
        }
    }
}

fn branch_heading(branch: Option<&str>) -> String {
    branch.map(|b| format!(" sur la branche {b}")).unwrap_or_default()
}

fn format_latest_commit_reply(commit: &CommitRecord, branch: Option<&str>, summary: &str) -> String {
    format!(
        "**Résumé du dernier commit{}:**\n\n**Auteur:** {}\n**Nom du commit:** {}\n**Date:** {}\n\n{}",
        branch_heading(branch),
        commit.author,
        commit.title(),
        commit.formatted_date(),
        summary
    )
}

fn format_found_commit_reply(commit: &CommitRecord, branch: Option<&str>, summary: &str) -> String {
    format!(
        "**Résumé du commit \"{}\"{}:**\n\n**Auteur:** {}\n**SHA:** {}\n**Date:** {}\n\n{}",
        commit.title(),
        branch_heading(branch),
        commit.author,
        commit.short_sha(),
        commit.formatted_date(),
        summary
    )
}

pub(crate) fn format_repo_info(info: &RepositoryInfo) -> String {
    format!(
        "**Informations sur le dépôt {}:**\n\n📝 Description: {}\n🌿 Branche par défaut: {}\n🔄 Dernière mise à jour des informations: {}",
        info.name,
        info.description.as_deref().unwrap_or("Aucune description"),
        info.default_branch,
        info.last_refreshed.format(DISPLAY_DATE_FORMAT)
    )
}

async fn run_command(state: &BotState, command: &SlashCommand) -> Result<String> {
    let repo_info = state.repo_info().await;
    let repository = state.repository(repo_info.as_deref());

    match command {
        SlashCommand::ResumeLastCommit { branch } => {
            let Some(commit) = repository.latest_commit(branch.as_deref()).await? else {
                return Ok("Aucun commit trouvé sur cette branche.".to_string());
            };
            let summary = state.openai.complete(commit_summary_prompt(&commit)).await?;
            Ok(format_latest_commit_reply(&commit, branch.as_deref(), &summary))
        }
        SlashCommand::ResumeCommit { commit: query, branch } => {
            let Some(commit) = repository
                .find_commit_by_substring(query, branch.as_deref())
                .await?
            else {
                return Ok(format!(
                    "Aucun commit contenant \"{}\" n'a été trouvé{}.",
                    query,
                    branch_heading(branch.as_deref())
                ));
            };
            let summary = state.openai.complete(commit_summary_prompt(&commit)).await?;
            Ok(format_found_commit_reply(&commit, branch.as_deref(), &summary))
        }
        SlashCommand::InfoRepo => {
            let fresh = repository.fetch_repository_info().await?;
            let info = state.set_repo_info(fresh).await;
            Ok(format_repo_info(&info))
        }
        SlashCommand::ContenuFichier { chemin, branch } => {
            let content = repository.file_content(chemin, branch.as_deref()).await?;
            Ok(format_file_content(chemin, branch.as_deref(), &content))
        }
    }
}

/// Runs a slash command whose reply was already deferred.
pub async fn handle_command(state: Arc<BotState>, interaction: Interaction) -> Result<()> {
    let Some(command) = interaction.data.as_ref().and_then(SlashCommand::parse) else {
        warn!(interaction_id = %interaction.id, "Received unknown or incomplete command");
        return respond_with_fallback(&state, &interaction, UNKNOWN_COMMAND_REPLY).await;
    };
    info!(command = command.name(), interaction_id = %interaction.id, "Running slash command");

    match run_command(&state, &command).await {
        Ok(text) => {
            let mut chunks = chunk_text(&text, MESSAGE_CHUNK_SIZE).into_iter();
            let first = chunks.next().unwrap_or_default();
            respond_with_fallback(&state, &interaction, &first).await?;
            for chunk in chunks {
                follow_up_with_fallback(&state, &interaction, &chunk).await?;
            }
            Ok(())
        }
        Err(e) => {
            error!(
                "Erreur lors de l'exécution de la commande {}: {:#}",
                command.name(),
                e
            );
            let text = fit_message(&format!(
                "Désolé, une erreur s'est produite lors de l'exécution de cette commande: {:#}",
                e
            ));
            respond_with_fallback(&state, &interaction, &text).await
        }
    }
}

/// Edit the deferred reply, else post a follow-up, else write to the channel
async fn respond_with_fallback(state: &BotState, interaction: &Interaction, content: &str) -> Result<()> {
    match state
        .platform
        .edit_original_response(&interaction.token, content)
        .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Failed to edit deferred reply ({}), trying a follow-up", e);
            follow_up_with_fallback(state, interaction, content).await
        }
    }
}

async fn follow_up_with_fallback(state: &BotState, interaction: &Interaction, content: &str) -> Result<()> {
    match state.platform.create_followup(&interaction.token, content).await {
        Ok(()) => Ok(()),
        Err(followup_err) => {
            let channel_id = interaction.channel_id.as_deref().ok_or_else(|| {
                error!("Follow-up failed and the interaction has no channel: {}", followup_err);
                anyhow!("Failed to deliver command response: {}", followup_err)
            })?;
            warn!("Follow-up failed ({}), sending to channel {}", followup_err, channel_id);
            state
                .platform
                .send_message(channel_id, content)
                .await
                .map_err(|e| {
                    error!("Failed to deliver command response in channel {}: {}", channel_id, e);
                    anyhow!("Failed to deliver command response: {}", e)
                })
        }
    }
}
