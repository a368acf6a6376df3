use crate::discord::{ChatPlatform, MESSAGE_CHAR_LIMIT};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const MESSAGE_CHUNK_SIZE: usize = MESSAGE_CHAR_LIMIT;
/// Files longer than this are shown truncated
pub const FILE_DISPLAY_LIMIT: usize = 1900;
pub const FILE_PREVIEW_CHARS: usize = 1800;

/// Splits `text` into pieces of at most `chunk_size` characters.
/// Concatenating the pieces yields `text` again.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Paths longer than this are shown with their leading part elided
const MAX_PATH_DISPLAY_CHARS: usize = 200;

fn display_path(path: &str) -> String {
    let count = path.chars().count();
    if count <= MAX_PATH_DISPLAY_CHARS {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (MAX_PATH_DISPLAY_CHARS - 1)).collect();
    format!("…{tail}")
}

/// Single-message rendering of a repository file; long files are cut, never split.
/// The result never exceeds [`MESSAGE_CHAR_LIMIT`].
pub fn format_file_content(path: &str, branch: Option<&str>, content: &str) -> String {
    let path = display_path(path);
    let char_count = content.chars().count();
    if char_count <= FILE_DISPLAY_LIMIT {
        let branch_note = branch
            .map(|b| format!(" (branche: {b})"))
            .unwrap_or_default();
        let rendered = format!("Contenu du fichier **{path}**{branch_note}:\n\n```\n{content}\n```");
        if rendered.chars().count() <= MESSAGE_CHAR_LIMIT {
            return rendered;
        }
    }
    truncated_file_content(&path, content, char_count)
}

fn truncated_file_content(path: &str, content: &str, char_count: usize) -> String {
    let header = format!(
        "Le fichier **{path}** est trop volumineux pour être affiché en entier. \
        Voici les premières lignes:\n\n```\n"
    );
    let footer = |shown: usize| {
        format!("\n...\n```\n_Fichier tronqué: {shown} caractères affichés sur {char_count}._")
    };

    // The footer is widest with the full preview count
    let overhead = header.chars().count() + footer(FILE_PREVIEW_CHARS).chars().count();
    let shown = FILE_PREVIEW_CHARS
        .min(MESSAGE_CHAR_LIMIT.saturating_sub(overhead))
        .min(char_count);
    let preview: String = content.chars().take(shown).collect();
    format!("{header}{preview}{}", footer(shown))
}

/// Repeats the typing signal in a channel until stopped or dropped.
pub struct TypingIndicator {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    pub fn start(platform: Arc<dyn ChatPlatform>, channel_id: &str, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let channel_id = channel_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                if let Err(e) = platform.send_typing(&channel_id).await {
                    warn!(channel_id = %channel_id, "Failed to send typing indicator: {}", e);
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!(channel_id = %channel_id, "Typing indicator stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancels the indicator and waits for its task to finish
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Typing indicator task failed: {}", e);
            }
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{PlatformEvent, RecordingPlatform};

    #[test]
    fn test_chunk_text_reconstructs_input() {
        let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, 2000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[2].chars().count(), 500);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_text_counts_characters_not_bytes() {
        let text = "é".repeat(2001);
        let chunks = chunk_text(&text, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "é");
    }

    #[test]
    fn test_chunk_text_edge_sizes() {
        assert!(chunk_text("", 2000).is_empty());
        assert_eq!(chunk_text(&"x".repeat(2000), 2000).len(), 1);
        assert_eq!(chunk_text(&"x".repeat(4000), 2000).len(), 2);
    }

    #[test]
    fn test_large_file_is_truncated_in_one_message() {
        let content: String = "0123456789".repeat(250);
        let rendered = format_file_content("README.md", None, &content);

        assert!(rendered.contains("trop volumineux"));
        assert!(rendered.contains(&content[..FILE_PREVIEW_CHARS]));
        assert!(!rendered.contains(&content[..FILE_PREVIEW_CHARS + 1]));
        assert!(rendered.chars().count() <= MESSAGE_CHAR_LIMIT);
    }

    #[test]
    fn test_large_file_with_long_path_fits_one_message() {
        let path = "src/components/authentication/forms/LoginFormWithValidation.tsx";
        let rendered = format_file_content(path, None, &"x".repeat(2500));

        assert!(rendered.contains(path));
        assert!(rendered.contains("trop volumineux"));
        assert!(rendered.chars().count() <= MESSAGE_CHAR_LIMIT);
        assert_eq!(chunk_text(&rendered, MESSAGE_CHUNK_SIZE).len(), 1);
    }

    #[test]
    fn test_very_long_path_is_elided() {
        let path = format!("{}/main.rs", "deep".repeat(100));
        let rendered = format_file_content(&path, None, &"y".repeat(2500));

        assert!(rendered.contains("…"));
        assert!(rendered.contains("/main.rs**"));
        assert!(rendered.contains(&"y".repeat(1000)));
        assert!(rendered.chars().count() <= MESSAGE_CHAR_LIMIT);
    }

    #[test]
    fn test_file_at_display_limit_with_long_branch_stays_in_one_message() {
        let content = "z".repeat(FILE_DISPLAY_LIMIT);
        let branch = "feature/".repeat(20);
        let rendered = format_file_content("README.md", Some(&branch), &content);

        assert!(rendered.chars().count() <= MESSAGE_CHAR_LIMIT);
        assert!(rendered.contains("trop volumineux"));
    }

    #[test]
    fn test_small_file_is_shown_whole() {
        let rendered = format_file_content("Cargo.toml", Some("develop"), "[package]");
        assert_eq!(
            rendered,
            "Contenu du fichier **Cargo.toml** (branche: develop):\n\n```\n[package]\n```"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_indicator_repeats_until_stopped() {
        let platform = Arc::new(RecordingPlatform::default());
        let indicator = TypingIndicator::start(platform.clone(), "42", Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(12)).await;
        indicator.stop().await;
        let after_stop = platform.typing_count();
        assert_eq!(after_stop, 3);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(platform.typing_count(), after_stop);
        assert!(platform
            .events()
            .iter()
            .all(|e| matches!(e, PlatformEvent::Typing { channel_id } if channel_id == "42")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_indicator_cancelled_on_drop() {
        let platform = Arc::new(RecordingPlatform::default());
        {
            let _indicator = TypingIndicator::start(platform.clone(), "42", Duration::from_secs(5));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(platform.typing_count(), 1);
    }
}
