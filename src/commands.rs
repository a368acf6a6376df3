use crate::models::InteractionData;
use serde_json::{json, Value};

const OPTION_TYPE_STRING: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    ResumeLastCommit { branch: Option<String> },
    ResumeCommit { commit: String, branch: Option<String> },
    InfoRepo,
    ContenuFichier { chemin: String, branch: Option<String> },
}

impl SlashCommand {
    pub const RESUME_LAST_COMMIT: &'static str = "resume_last_commit";
    pub const RESUME_COMMIT: &'static str = "resume_commit";
    pub const INFO_REPO: &'static str = "info_repo";
    pub const CONTENU_FICHIER: &'static str = "contenu_fichier";

    /// Returns `None` for unknown commands or missing required options
    pub fn parse(data: &InteractionData) -> Option<Self> {
        let branch = data.string_option("branch");
        match data.name.as_str() {
            Self::RESUME_LAST_COMMIT => Some(Self::ResumeLastCommit { branch }),
            Self::RESUME_COMMIT => Some(Self::ResumeCommit {
                commit: data.string_option("commit")?,
                branch,
            }),
            Self::INFO_REPO => Some(Self::InfoRepo),
            Self::CONTENU_FICHIER => Some(Self::ContenuFichier {
                chemin: data.string_option("chemin")?,
                branch,
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ResumeLastCommit { .. } => Self::RESUME_LAST_COMMIT,
            Self::ResumeCommit { .. } => Self::RESUME_COMMIT,
            Self::InfoRepo => Self::INFO_REPO,
            Self::ContenuFichier { .. } => Self::CONTENU_FICHIER,
        }
    }
}

fn string_option(name: &str, description: &str, required: bool) -> Value {
    json!({
        "type": OPTION_TYPE_STRING,
        "name": name,
        "description": description,
        "required": required,
    })
}

fn branch_option() -> Value {
    string_option(
        "branch",
        "Nom de la branche (laissez vide pour la branche par défaut)",
        false,
    )
}

/// Payload for `PUT /applications/{id}/commands`
pub fn command_definitions() -> Value {
    json!([
        {
            "name": SlashCommand::RESUME_LAST_COMMIT,
            "description": "Résume le dernier commit d'une branche",
            "options": [branch_option()],
        },
        {
            "name": SlashCommand::RESUME_COMMIT,
            "description": "Résume un commit spécifique d'une branche",
            "options": [
                string_option("commit", "Titre ou partie du message du commit à rechercher", true),
                branch_option(),
            ],
        },
        {
            "name": SlashCommand::INFO_REPO,
            "description": "Affiche les informations sur le dépôt GitHub",
        },
        {
            "name": SlashCommand::CONTENU_FICHIER,
            "description": "Affiche le contenu d'un fichier du dépôt",
            "options": [
                string_option("chemin", "Chemin du fichier", true),
                branch_option(),
            ],
        },
    ])
}
