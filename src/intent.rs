//! Rule-based detection of repository questions in free-form chat messages.
//!
//! Rules are evaluated in a fixed order.

use once_cell::sync::Lazy;
use regex::Regex;

const GIT_KEYWORDS: [&str; 6] = ["github", "commit", "dépôt", "repo", "branche", "branch"];
const SUMMARY_VERBS: [&str; 2] = ["resume", "résume"];
const LATEST_MARKER: &str = "dernier commit";

static COMMIT_TOKEN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)commit\s+["'](.*?)["']"#,
        r#"(?i)commit\s+(\S+)"#,
        r#"(?i)le\s+commit\s+["'](.*?)["']"#,
        r#"(?i)le\s+commit\s+(\S+)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static commit pattern"))
    .collect()
});

static BRANCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)branch\s+(\w+)", r"(?i)branche\s+(\w+)"]
        .iter()
        .map(|p| Regex::new(p).expect("static branch pattern"))
        .collect()
});

static SHA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[0-9a-f]{7,40}\b").expect("static sha pattern"));

/// User, role and channel mentions plus custom emoji; their ids are all digits
static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:@[!&]?|#|a?:\w+:)\d+>").expect("static mention pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitIntent {
    LatestCommit { branch: Option<String> },
    SpecificCommit { query: String, branch: Option<String> },
    /// A specific commit was asked for but no target could be extracted
    UnresolvedCommit,
    ShaLookup { sha: String },
}

/// Returns every intent found in `message`, keyword intent first.
/// An empty result means the message is not about the repository.
pub fn extract_intents(message: &str) -> Vec<GitIntent> {
    let mut intents = Vec::new();
    if let Some(intent) = keyword_intent(message) {
        intents.push(intent);
    }
    if let Some(sha) = extract_sha(message) {
        intents.push(GitIntent::ShaLookup { sha });
    }
    intents
}

fn keyword_intent(message: &str) -> Option<GitIntent> {
    let lowered = message.to_lowercase();
    if !mentions_repository(&lowered) {
        return None;
    }
    let asks_summary = SUMMARY_VERBS.iter().any(|v| lowered.contains(v));
    if !asks_summary {
        return None;
    }

    if lowered.contains(LATEST_MARKER) {
        return Some(GitIntent::LatestCommit {
            branch: extract_branch(message),
        });
    }
    if lowered.contains("commit") {
        return Some(match extract_commit_token(message) {
            Some(query) => GitIntent::SpecificCommit {
                query,
                branch: extract_branch(message),
            },
            None => GitIntent::UnresolvedCommit,
        });
    }
    None
}

pub fn mentions_repository(lowered: &str) -> bool {
    GIT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Target of a "résume le commit X" request, exactly as written
pub fn extract_commit_token(message: &str) -> Option<String> {
    first_capture(&COMMIT_TOKEN_PATTERNS, message)
}

/// Branch names are Unicode word characters, so `développement` is kept whole
pub fn extract_branch(message: &str) -> Option<String> {
    first_capture(&BRANCH_PATTERNS, message)
}

pub fn extract_sha(message: &str) -> Option<String> {
    let text = MENTION_PATTERN.replace_all(message, " ");
    SHA_PATTERN.find(&text).map(|m| m.as_str().to_string())
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    })
}
