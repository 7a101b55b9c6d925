use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use tokio::sync::{Mutex, OwnedMutexGuard};

use mochi_core::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    counting::GroupStore,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<GroupStore>,
    pub messenger: Arc<dyn MessagingPort>,
    pub chat_locks: Arc<ChatLocks>,
    pub audit: Option<Arc<AuditLogger>>,
    /// `@username` of the bot without the `@`, used for invites and `/cmd@bot`.
    pub bot_username: String,
}

impl AppState {
    /// Best-effort audit write; failures only get logged.
    pub fn audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            tracing::warn!(path = %audit.path().display(), error = %e, "failed to write audit event");
        }
    }
}

/// Per-chat serialization of update handling.
///
/// Holding the chat's guard across evaluate + replies keeps announcements in the
/// same order as the counts they describe.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Commands advertised in the Telegram client menu.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("reset", "Reset the mochi counter."),
        BotCommand::new("show_count", "View the current mochi count."),
        BotCommand::new("leaderboard", "View the group's high score."),
        BotCommand::new("invite", "Get a link to add the bot to another group."),
        BotCommand::new("help", "How to play."),
    ]
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<GroupStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    let bot_username = me.username().to_string();
    tracing::info!(name = %cfg.bot_name, username = %bot_username, "bot online");

    match bot.set_my_commands(bot_commands()).await {
        Ok(_) => tracing::info!(count = bot_commands().len(), "synced commands with Telegram"),
        Err(e) => tracing::error!(error = %e, "failed to sync commands"),
    }

    // Wrap the raw Telegram messenger with a throttling decorator to reduce 429s in
    // busy counting chats. We still keep a 429 RetryAfter retry at the adapter layer.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::from(cfg.as_ref()),
    ));

    let audit = cfg.audit_log_enabled.then(|| {
        tracing::info!(path = %cfg.audit_log_path.display(), "audit log enabled");
        Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        ))
    });

    let state = Arc::new(AppState {
        cfg,
        store,
        messenger,
        chat_locks: Arc::new(ChatLocks::default()),
        audit,
        bot_username,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;

    Ok(())
}
