// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use quarry_core::types::{BotIdentity, UserId};

/// System prompt template with `{user}` and `{bot}` placeholders.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    template: String,
}

impl SystemPrompt {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Expands the placeholders to mention tokens. An unknown user reads as "the user".
    pub fn render(&self, user: Option<&UserId>, bot: &BotIdentity) -> String {
        let user = user.map_or_else(|| "the user".to_string(), UserId::mention);
        self.template
            .replace("{user}", &user)
            .replace("{bot}", &bot.mention_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> BotIdentity {
        BotIdentity {
            bot_id: "B1".into(),
            bot_user_id: UserId::from("UBOT"),
        }
    }

    #[test]
    fn fills_both_placeholders() {
        let prompt = SystemPrompt::new("{bot} helps {user}. {user} asks.");
        assert_eq!(
            prompt.render(Some(&UserId::from("U1")), &bot()),
            "<@UBOT> helps <@U1>. <@U1> asks."
        );
    }

    #[test]
    fn unknown_user() {
        let prompt = SystemPrompt::new("hello {user}");
        assert_eq!(prompt.render(None, &bot()), "hello the user");
    }
}
