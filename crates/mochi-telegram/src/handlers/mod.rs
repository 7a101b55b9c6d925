//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - filters out updates the game should not see (bots, non-text, no sender)
//! - calls into the `mochi-core` counting game
//! - turns the result into Telegram messages

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;
mod count;

/// Where an incoming message goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    Skip,
    Command,
    Count,
}

/// Slash-prefixed text is always a command and never a count attempt.
pub(crate) fn route(is_bot: bool, ignore_bots: bool, text: Option<&str>) -> Route {
    if is_bot && ignore_bots {
        return Route::Skip;
    }
    match text {
        None => Route::Skip,
        Some(t) if t.starts_with('/') => Route::Command,
        Some(_) => Route::Count,
    }
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let route = route(user.is_bot, state.cfg.ignore_bots, msg.text());
    if route == Route::Skip {
        return Ok(());
    }

    // Sequentialize everything per chat: counts and commands touch the same state.
    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;

    match route {
        Route::Command => commands::handle_command(&msg, state).await,
        Route::Count => count::handle_count(&msg, state).await,
        Route::Skip => Ok(()),
    }
}

/// Name used when addressing a user in announcements.
pub(crate) fn display_name(user: &teloxide::types::User) -> String {
    match &user.username {
        Some(username) if !username.is_empty() => username.clone(),
        _ => user.full_name(),
    }
}
