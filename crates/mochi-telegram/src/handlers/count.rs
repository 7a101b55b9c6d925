use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use mochi_core::{
    audit::{describe_break, AuditEvent},
    counting::{
        respond::{respond, Submission},
        Outcome,
    },
    domain::{ChatId, MessageId, MessageRef, UserId},
};

use super::display_name;
use crate::router::AppState;

pub async fn handle_count(msg: &Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let user_id = UserId(user.id.0 as i64);
    let name = display_name(user);

    let outcome = state.store.evaluate(chat_id, user_id, text).await;
    match &outcome {
        Outcome::Ignore => return Ok(()),
        Outcome::Accept { new_count } => {
            tracing::debug!(chat_id = chat_id.0, user_id = user_id.0, count = new_count, "count accepted");
        }
        Outcome::Reject {
            broken_at,
            new_high_score,
            reason,
        } => {
            tracing::info!(
                chat_id = chat_id.0,
                user_id = user_id.0,
                broken_at,
                new_high_score = ?new_high_score,
                reason = %describe_break(reason),
                "count broken"
            );
        }
    }

    if let Some(event) = AuditEvent::outcome(chat_id, user_id, &name, text, &outcome) {
        state.audit(event);
    }

    let submission = Submission {
        message: MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        },
        display_name: &name,
    };
    respond(
        state.messenger.as_ref(),
        submission,
        &outcome,
        &state.cfg.count_reaction,
    )
    .await;

    Ok(())
}
