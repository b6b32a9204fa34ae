// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal of the bot's own mention token from message text.

use quarry_core::types::UserId;
use quarry_core::QuarryError;
use regex::Regex;

/// Strips `<@BOT_USER_ID>` plus trailing whitespace.
#[derive(Debug, Clone)]
pub struct MentionStripper {
    token: String,
    pattern: Regex,
}

impl MentionStripper {
    pub fn new(bot_user_id: &UserId) -> Result<Self, QuarryError> {
        let token = bot_user_id.mention();
        let pattern = Regex::new(&format!(r"{}\s*", regex::escape(&token)))
            .map_err(|e| QuarryError::Internal(format!("mention pattern: {e}")))?;
        Ok(Self { token, pattern })
    }

    /// Removes every occurrence of the token.
    ///
    /// Repeats until nothing changes, so text like `<@<@U1>U1>` cannot
    /// reassemble a token and `strip(strip(x)) == strip(x)` holds.
    pub fn strip(&self, text: &str) -> String {
        let mut current = text.to_string();
        loop {
            let next = self.pattern.replace_all(&current, "").into_owned();
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Whether `text` mentions the bot.
    pub fn mentions(&self, text: &str) -> bool {
        text.contains(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripper() -> MentionStripper {
        MentionStripper::new(&UserId::from("UBOT")).unwrap()
    }

    #[test]
    fn strips_token_and_trailing_whitespace() {
        assert_eq!(stripper().strip("<@UBOT>   show revenue"), "show revenue");
        assert_eq!(stripper().strip("hey <@UBOT> hi"), "hey hi");
    }

    #[test]
    fn other_mentions_are_kept() {
        assert_eq!(stripper().strip("<@U123> said hi"), "<@U123> said hi");
    }

    #[test]
    fn nested_token_does_not_survive() {
        assert_eq!(stripper().strip("<@<@UBOT>UBOT>x"), "x");
    }

    #[test]
    fn detects_mentions() {
        assert!(stripper().mentions("ping <@UBOT>"));
        assert!(!stripper().mentions("ping <@UOTHER>"));
    }
}
