//! Telegram adapter (teloxide).
//!
//! This crate implements the `mochi-core` MessagingPort over the Telegram Bot API
//! and wires incoming updates into the counting game.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, ReactionType},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use mochi_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(after)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    let wait = after.duration();
                    tracing::debug!(?wait, "telegram asked us to retry later");
                    sleep(wait).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_reactions: true,
            supports_delete: true,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn set_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .set_message_reaction(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
                .reaction(reaction_for(emoji))
        })
        .await?;
        Ok(())
    }
}

/// Telegram only accepts a fixed emoji set for reactions; anything else is
/// rejected by the API and surfaces as an `External` error.
fn reaction_for(emoji: &str) -> Vec<ReactionType> {
    vec![ReactionType::Emoji {
        emoji: emoji.to_string(),
    }]
}
