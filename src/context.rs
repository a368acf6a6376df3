use crate::config::AppSettings;
use crate::models::{CommitRecord, ConversationMessage, DiscordMessage, DiscordUser, RepositoryInfo};
use tracing::warn;

const NOT_AVAILABLE: &str = "Non disponible";

const COMMIT_ANALYSIS_PERSONA: &str = "Tu es un assistant spécialisé dans l'analyse de code. \
Analyse les modifications suivantes et résume-les de manière concise et claire. \
Explique les changements principaux et leur impact potentiel. \
Ne mentionne pas l'auteur, le nom du commit ou la date car ces informations seront ajoutées séparément. \
Réponds en français.";

/// System persona for channel conversations
pub fn chat_persona(bot_name: &str, settings: &AppSettings, repo: Option<&RepositoryInfo>) -> ConversationMessage {
    let default_branch = repo.map(|r| r.default_branch.as_str()).unwrap_or(NOT_AVAILABLE);
    let description = repo
        .and_then(|r| r.description.as_deref())
        .unwrap_or(NOT_AVAILABLE);

    ConversationMessage::system(format!(
        "Tu es un assistant IA intégré à Discord nommé {bot_name}.\n\
        \n\
        RÈGLES DE BASE:\n\
        - Réponds toujours en français par défaut, sauf si la question est posée en anglais\n\
        - Sois clair, précis et utile dans tes réponses\n\
        - Tu es spécialisé dans l'aide au développement et peux aider avec du code\n\
        \n\
        CONTEXTE GITHUB:\n\
        - Tu as accès au dépôt GitHub: {repo_slug}\n\
        - Branche par défaut: {default_branch}\n\
        - Description: {description}\n\
        \n\
        FONCTIONNALITÉS:\n\
        - Tu peux résumer le dernier commit d'une branche avec la commande /resume_last_commit [branch]\n\
        - Tu peux résumer un commit spécifique avec la commande /resume_commit [commit] [branch]\n\
        - Tu peux afficher les informations du dépôt avec /info_repo\n\
        - Tu peux afficher le contenu d'un fichier avec /contenu_fichier [chemin] [branch]\n\
        \n\
        Si l'utilisateur demande des informations sur le dépôt GitHub, rappelle-lui qu'il peut utiliser \
        ces commandes ou pose-lui des questions sur GitHub directement.",
        repo_slug = settings.repo_slug(),
    ))
}

fn commit_facts(commit: &CommitRecord) -> String {
    // Every file is embedded; the count must match the list
    let files_json = serde_json::to_string_pretty(&commit.files).unwrap_or_else(|e| {
        warn!("Failed to serialize file changes of {}: {}", commit.sha, e);
        "[]".to_string()
    });
    format!(
        "SHA: {}\nMessage: {}\nAuteur: {}\nDate: {}\nFichiers modifiés: {}\n\nDétails des modifications:\n{}",
        commit.sha,
        commit.message,
        commit.author,
        commit.formatted_date(),
        commit.files.len(),
        files_json
    )
}

fn branch_suffix(prefix: &str, branch: Option<&str>) -> String {
    branch.map(|b| format!(" {prefix} {b}")).unwrap_or_default()
}

pub fn latest_commit_context(commit: &CommitRecord, branch: Option<&str>) -> ConversationMessage {
    ConversationMessage::system(format!(
        "Informations sur le dernier commit{}:\n{}",
        branch_suffix("de la branche", branch),
        commit_facts(commit)
    ))
}

pub fn found_commit_context(commit: &CommitRecord, branch: Option<&str>) -> ConversationMessage {
    ConversationMessage::system(format!(
        "Informations sur le commit \"{}\"{}:\n{}",
        commit.title(),
        branch_suffix("de la branche", branch),
        commit_facts(commit)
    ))
}

pub fn sha_commit_context(commit: &CommitRecord) -> ConversationMessage {
    ConversationMessage::system(format!(
        "Informations sur le commit {}:\n{}",
        commit.short_sha(),
        commit_facts(commit)
    ))
}

pub fn commit_not_found_context(query: &str, branch: Option<&str>) -> ConversationMessage {
    ConversationMessage::system(format!(
        "Je n'ai pas pu trouver de commit contenant \"{}\"{}.",
        query,
        branch_suffix("dans la branche", branch)
    ))
}

/// Prompt used by slash commands to summarise a single commit
pub fn commit_summary_prompt(commit: &CommitRecord) -> Vec<ConversationMessage> {
    vec![
        ConversationMessage::system(COMMIT_ANALYSIS_PERSONA),
        ConversationMessage::user(None, format!("Résume le commit suivant:\n{}", commit_facts(commit))),
    ]
}

/// Completion API names must match `[A-Za-z0-9_-]+`
pub fn sanitize_name(username: &str) -> Option<String> {
    let name: String = username
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Maps channel history (newest first, as Discord returns it) to chronological
/// conversation messages.
pub fn history_to_conversation(
    history: Vec<DiscordMessage>,
    bot: &DiscordUser,
    ignore_prefix: &str,
) -> Vec<ConversationMessage> {
    history
        .into_iter()
        .rev()
        .filter_map(|msg| {
            let from_self = msg.author.id == bot.id;
            if msg.author.bot && !from_self {
                return None;
            }
            if msg.content.starts_with(ignore_prefix) || msg.content.trim().is_empty() {
                return None;
            }
            let name = sanitize_name(&msg.author.username);
            Some(if from_self {
                ConversationMessage::assistant(name, msg.content)
            } else {
                ConversationMessage::user(name, msg.content)
            })
        })
        .collect()
}

/// Orders the prompt: persona, git facts, history, then the current message
pub fn assemble_conversation(
    persona: ConversationMessage,
    git_context: Vec<ConversationMessage>,
    history: Vec<ConversationMessage>,
    current: ConversationMessage,
) -> Vec<ConversationMessage> {
    let mut conversation = Vec::with_capacity(git_context.len() + history.len() + 2);
    conversation.push(persona);
    conversation.extend(git_context);
    conversation.extend(history);
    conversation.push(current);
    conversation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, FileChange, FileStatus};
    use chrono::{TimeZone, Utc};

    fn user(id: &str, name: &str, bot: bool) -> DiscordUser {
        DiscordUser {
            id: id.to_string(),
            username: name.to_string(),
            bot,
        }
    }

    fn message(id: &str, author: DiscordUser, content: &str) -> DiscordMessage {
        DiscordMessage {
            id: id.to_string(),
            channel_id: "42".to_string(),
            author,
            content: content.to_string(),
        }
    }

    fn sample_commit(file_count: usize) -> CommitRecord {
        CommitRecord {
            sha: "9fceb02d0ae598e95dc970b74767f19372d61af8".to_string(),
            message: "Add cache layer\n\nLonger body".to_string(),
            author: "Alice".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            files: (0..file_count)
                .map(|i| FileChange {
                    filename: format!("src/file_{i}.rs"),
                    status: FileStatus::Modified,
                    additions: 3,
                    deletions: 1,
                    changes: 4,
                    patch: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_history_mapping_filters_and_orders() {
        let bot = user("1", "GitBot", true);
        // Newest first, as returned by the API
        let history = vec![
            message("6", user("2", "alice", false), "   "),
            message("5", user("3", "other-bot", true), "beep"),
            message("4", user("2", "alice", false), "!ignored"),
            message("3", bot.clone(), "Voici le résumé"),
            message("2", user("2", "Alice Smith", false), "résume le dernier commit"),
        ];

        let conversation = history_to_conversation(history, &bot, "!");

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].role, ChatRole::User);
        assert_eq!(conversation[0].name.as_deref(), Some("Alice_Smith"));
        assert_eq!(conversation[0].content, "résume le dernier commit");
        assert_eq!(conversation[1].role, ChatRole::Assistant);
        assert_eq!(conversation[1].name.as_deref(), Some("GitBot"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Jean Pierre"), Some("Jean_Pierre".to_string()));
        assert_eq!(sanitize_name("zoé!!"), Some("zo".to_string()));
        assert_eq!(sanitize_name("★★"), None);
    }

    #[test]
    fn test_commit_context_reports_every_file() {
        let commit = sample_commit(12);
        let msg = latest_commit_context(&commit, Some("develop"));

        assert_eq!(msg.role, ChatRole::System);
        assert!(msg.content.starts_with("Informations sur le dernier commit de la branche develop:"));
        assert!(msg.content.contains("Fichiers modifiés: 12"));
        assert!(msg.content.contains("Auteur: Alice"));
        assert!(msg.content.contains("Date: 05/03/2024 14:07:09"));
        assert!(msg.content.contains("src/file_11.rs"));
    }

    #[test]
    fn test_assemble_conversation_order() {
        let conversation = assemble_conversation(
            ConversationMessage::system("persona"),
            vec![ConversationMessage::system("git")],
            vec![ConversationMessage::user(None, "old")],
            ConversationMessage::user(None, "now"),
        );
        let contents: Vec<_> = conversation.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["persona", "git", "old", "now"]);
    }

    #[test]
    fn test_persona_without_repository_info() {
        let settings = AppSettings {
            github_owner: "octo".to_string(),
            github_repo: "hello".to_string(),
            ..AppSettings::default()
        };
        let persona = chat_persona("GitBot", &settings, None);
        assert!(persona.content.contains("nommé GitBot"));
        assert!(persona.content.contains("octo/hello"));
        assert!(persona.content.contains("Branche par défaut: Non disponible"));
    }
}
