use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use mochi_core::{
    audit::AuditEvent,
    counting::respond::{count_text, invite_text, leaderboard_text, reset_text},
    domain::{ChatId, UserId},
    formatting::escape_html,
};

use super::display_name;
use crate::router::AppState;

/// Split `/cmd@botname args` into the lowercased command and its `@` target.
fn parse_command(text: &str) -> (String, Option<String>) {
    let first = text.split_whitespace().next().unwrap_or("");
    let mut parts = first.trim_start_matches('/').splitn(2, '@');
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let target = parts
        .next()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());
    (cmd, target)
}

fn addressed_to_us(target: Option<&str>, bot_username: &str) -> bool {
    match target {
        None => true,
        Some(t) => t.eq_ignore_ascii_case(bot_username),
    }
}

fn help_text(bot_name: &str) -> String {
    format!(
        "🍡 <b>{}</b>\n\n\
Count together, one number per message: 1, 2, 3...\n\
• The same person can't count twice in a row.\n\
• A wrong number ruins the count and it starts over at 1.\n\
• Math works too: <code>2*3</code> counts as 6.\n\n\
<b>Commands:</b>\n\
/show_count - Current count\n\
/leaderboard - This group's high score\n\
/reset - Reset the counter\n\
/invite - Add me to another group",
        escape_html(bot_name)
    )
}

pub async fn handle_command(msg: &Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let (cmd, target) = parse_command(text);
    if !addressed_to_us(target.as_deref(), &state.bot_username) {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);
    let user_id = UserId(user.id.0 as i64);

    let reply = match cmd.as_str() {
        "start" | "help" => help_text(&state.cfg.bot_name),
        "reset" => {
            state.store.reset(chat_id).await;
            tracing::info!(chat_id = chat_id.0, user_id = user_id.0, "counter reset");
            reset_text().to_string()
        }
        "show_count" => count_text(state.store.count(chat_id).await),
        "leaderboard" => leaderboard_text(state.store.high_score(chat_id).await),
        "invite" => invite_text(&state.cfg.bot_name, &state.bot_username),
        _ => return Ok(()),
    };

    state.audit(AuditEvent::command(
        chat_id,
        user_id,
        &display_name(user),
        &cmd,
    ));

    if let Err(e) = state.messenger.send_html(chat_id, &reply).await {
        tracing::warn!(chat_id = chat_id.0, command = %cmd, error = %e, "failed to reply to command");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_addressed_commands() {
        assert_eq!(parse_command("/reset"), ("reset".to_string(), None));
        assert_eq!(
            parse_command("/Show_Count@MochiBot extra words"),
            ("show_count".to_string(), Some("MochiBot".to_string()))
        );
        assert_eq!(parse_command("/leaderboard@"), ("leaderboard".to_string(), None));
        assert_eq!(parse_command("  /invite  "), ("invite".to_string(), None));
    }

    #[test]
    fn only_answers_commands_for_this_bot() {
        assert!(addressed_to_us(None, "mochi_bot"));
        assert!(addressed_to_us(Some("Mochi_Bot"), "mochi_bot"));
        assert!(!addressed_to_us(Some("other_bot"), "mochi_bot"));
    }

    #[test]
    fn help_lists_commands() {
        let help = help_text("Counting <Mochi>");
        assert!(help.contains("Counting &lt;Mochi&gt;"));
        for cmd in ["/show_count", "/leaderboard", "/reset", "/invite"] {
            assert!(help.contains(cmd), "{cmd}");
        }
    }
}
