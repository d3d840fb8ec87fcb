mod discord;

pub use discord::DiscordNotifier;

use crate::error::BotResult;
use async_trait::async_trait;

/// Discord's maximum message length in characters
pub const MESSAGE_LIMIT: usize = 2000;

/// Delivers formatted text to the configured destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send already formatted text; fails with a delivery error
    async fn send(&self, text: &str) -> BotResult<()>;
}

/// Split text into chunks of at most `limit` characters, preferring line boundaries
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            // A single line longer than the limit is cut at character boundaries
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == limit {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_single_chunk() {
        assert_eq!(split_message("hello\nworld", 2000), vec!["hello\nworld".to_string()]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc\n";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc\n".to_string()]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_long_line_is_cut() {
        let text = "é".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_message() {
        assert!(split_message("", 2000).is_empty());
        assert!(split_message("\n\n", 2000).is_empty());
    }
}
