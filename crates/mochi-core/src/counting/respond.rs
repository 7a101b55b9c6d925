//! Turns counting outcomes into platform actions.
//!
//! Everything here is best-effort: a failed delete or send is logged and the
//! game state is left exactly as the evaluator decided.

use crate::{
    domain::MessageRef,
    formatting::{escape_html, mention},
    messaging::port::MessagingPort,
};

use super::evaluator::Outcome;

pub fn accept_text(new_count: u64) -> String {
    format!("{new_count} mochi caught! 🥟")
}

pub fn reject_text(display_name: &str, broken_at: u64, new_high_score: Option<u64>) -> String {
    let mut text = format!(
        "{} ruined it at {broken_at}!! Next number is 1. ",
        mention(display_name)
    );
    if let Some(hs) = new_high_score {
        text.push_str(&format!("🎉 New high score of {hs}! 🎉"));
    }
    text
}

pub fn reset_text() -> &'static str {
    "The mochis have been reset! 🌀"
}

pub fn count_text(count: u64) -> String {
    format!("The current count is {count} mochis! 🥟")
}

pub fn leaderboard_text(high_score: u64) -> String {
    format!("This group's high score is {high_score} mochis! 🎉")
}

pub fn invite_url(bot_username: &str) -> String {
    format!("https://t.me/{bot_username}?startgroup=true")
}

pub fn invite_text(bot_name: &str, bot_username: &str) -> String {
    format!(
        "Invite {} to your group: {}",
        escape_html(bot_name),
        invite_url(bot_username)
    )
}

/// Which platform actions actually went through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResponseReport {
    pub reacted: bool,
    pub deleted: bool,
    pub announced: bool,
}

/// The message being judged and how to address its author.
#[derive(Clone, Copy, Debug)]
pub struct Submission<'a> {
    pub message: MessageRef,
    pub display_name: &'a str,
}

/// Carry out what `outcome` directs for `submission`.
pub async fn respond(
    messenger: &dyn MessagingPort,
    submission: Submission<'_>,
    outcome: &Outcome,
    reaction: &str,
) -> ResponseReport {
    let msg = submission.message;
    let mut report = ResponseReport::default();

    match *outcome {
        Outcome::Ignore => {}
        Outcome::Accept { new_count } => {
            if messenger.capabilities().supports_reactions {
                match messenger.set_reaction(msg, reaction).await {
                    Ok(()) => report.reacted = true,
                    Err(e) => tracing::warn!(chat_id = msg.chat_id.0, error = %e, "failed to react"),
                }
            }
            report.announced = announce(messenger, msg, &accept_text(new_count)).await;
        }
        Outcome::Reject {
            broken_at,
            new_high_score,
            ..
        } => {
            if messenger.capabilities().supports_delete {
                match messenger.delete_message(msg).await {
                    Ok(()) => report.deleted = true,
                    Err(e) => {
                        tracing::warn!(chat_id = msg.chat_id.0, error = %e, "failed to delete message")
                    }
                }
            }
            let text = reject_text(submission.display_name, broken_at, new_high_score);
            report.announced = announce(messenger, msg, &text).await;
        }
    }

    report
}

async fn announce(messenger: &dyn MessagingPort, msg: MessageRef, text: &str) -> bool {
    match messenger.send_html(msg.chat_id, text).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(chat_id = msg.chat_id.0, error = %e, "failed to send announcement");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        counting::evaluator::BreakReason,
        domain::{ChatId, MessageId},
        errors::Error,
        messaging::types::MessagingCapabilities,
        Result,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMessenger {
        no_reactions: bool,
        no_delete: bool,
        fail_delete: bool,
        sends: Mutex<Vec<String>>,
        deletes: Mutex<Vec<MessageRef>>,
        reactions: Mutex<Vec<(MessageRef, String)>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_reactions: !self.no_reactions,
                supports_delete: !self.no_delete,
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.sends.lock().unwrap().push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(99),
            })
        }

        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            if self.fail_delete {
                return Err(Error::External("message can't be deleted".to_string()));
            }
            self.deletes.lock().unwrap().push(msg);
            Ok(())
        }

        async fn set_reaction(&self, msg: MessageRef, emoji: &str) -> Result<()> {
            self.reactions
                .lock()
                .unwrap()
                .push((msg, emoji.to_string()));
            Ok(())
        }
    }

    fn submission(name: &str) -> Submission<'_> {
        Submission {
            message: MessageRef {
                chat_id: ChatId(-42),
                message_id: MessageId(7),
            },
            display_name: name,
        }
    }

    #[test]
    fn texts() {
        assert_eq!(accept_text(3), "3 mochi caught! 🥟");
        assert_eq!(
            reject_text("ann", 5, None),
            "@ann ruined it at 5!! Next number is 1. "
        );
        assert_eq!(
            reject_text("ann", 5, Some(5)),
            "@ann ruined it at 5!! Next number is 1. 🎉 New high score of 5! 🎉"
        );
        assert_eq!(count_text(0), "The current count is 0 mochis! 🥟");
        assert_eq!(leaderboard_text(12), "This group's high score is 12 mochis! 🎉");
        assert_eq!(
            invite_text("Counting Mochi", "mochi_bot"),
            "Invite Counting Mochi to your group: https://t.me/mochi_bot?startgroup=true"
        );
    }

    #[tokio::test]
    async fn ignore_does_nothing() {
        let fake = FakeMessenger::default();
        let report = respond(&fake, submission("ann"), &Outcome::Ignore, "🍡").await;
        assert_eq!(report, ResponseReport::default());
        assert!(fake.sends.lock().unwrap().is_empty());
        assert!(fake.deletes.lock().unwrap().is_empty());
        assert!(fake.reactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_reacts_and_announces() {
        let fake = FakeMessenger::default();
        let report = respond(
            &fake,
            submission("ann"),
            &Outcome::Accept { new_count: 4 },
            "🍡",
        )
        .await;
        assert!(report.reacted && report.announced && !report.deleted);
        assert_eq!(fake.reactions.lock().unwrap()[0].1, "🍡");
        assert_eq!(*fake.sends.lock().unwrap(), vec!["4 mochi caught! 🥟"]);
    }

    #[tokio::test]
    async fn accept_skips_reaction_when_unsupported() {
        let fake = FakeMessenger {
            no_reactions: true,
            ..Default::default()
        };
        let report = respond(
            &fake,
            submission("ann"),
            &Outcome::Accept { new_count: 1 },
            "🍡",
        )
        .await;
        assert!(!report.reacted);
        assert!(report.announced);
    }

    #[tokio::test]
    async fn reject_deletes_and_announces_record() {
        let fake = FakeMessenger::default();
        let outcome = Outcome::Reject {
            broken_at: 8,
            new_high_score: Some(8),
            reason: BreakReason::SelfConsecutive,
        };
        let report = respond(&fake, submission("<bob>"), &outcome, "🍡").await;
        assert!(report.deleted && report.announced && !report.reacted);
        assert_eq!(fake.deletes.lock().unwrap()[0].message_id, MessageId(7));
        let sends = fake.sends.lock().unwrap();
        assert!(sends[0].starts_with("@&lt;bob&gt; ruined it at 8!!"));
        assert!(sends[0].contains("New high score of 8"));
    }

    #[tokio::test]
    async fn failed_delete_still_announces() {
        let fake = FakeMessenger {
            fail_delete: true,
            ..Default::default()
        };
        let outcome = Outcome::Reject {
            broken_at: 2,
            new_high_score: None,
            reason: BreakReason::WrongNumber {
                expected: 3,
                got: 5,
            },
        };
        let report = respond(&fake, submission("ann"), &outcome, "🍡").await;
        assert!(!report.deleted);
        assert!(report.announced);
    }

    #[tokio::test]
    async fn reject_skips_delete_when_unsupported() {
        let fake = FakeMessenger {
            no_delete: true,
            ..Default::default()
        };
        let outcome = Outcome::Reject {
            broken_at: 3,
            new_high_score: None,
            reason: BreakReason::SelfConsecutive,
        };
        let report = respond(&fake, submission("ann"), &outcome, "🍡").await;
        assert!(!report.deleted);
        assert!(report.announced);
        assert!(fake.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_uses_the_configured_reaction() {
        let fake = FakeMessenger::default();
        respond(
            &fake,
            submission("ann"),
            &Outcome::Accept { new_count: 2 },
            "👍",
        )
        .await;
        let reactions = fake.reactions.lock().unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].0.message_id, MessageId(7));
        assert_eq!(reactions[0].1, "👍");
    }
}
