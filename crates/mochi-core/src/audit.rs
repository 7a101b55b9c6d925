use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    counting::{BreakReason, Outcome},
    domain::{ChatId, UserId},
    errors::Error,
    Result,
};

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub chat_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_score: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, chat_id: ChatId) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            chat_id: chat_id.0,
            user_id: None,
            username: None,
            content: None,
            count: None,
            high_score: None,
            reason: None,
            command: None,
        }
    }

    /// Audit record for a judged message. `None` for ignored chatter.
    pub fn outcome(
        chat_id: ChatId,
        user_id: UserId,
        username: &str,
        content: &str,
        outcome: &Outcome,
    ) -> Option<Self> {
        let mut ev = match *outcome {
            Outcome::Ignore => return None,
            Outcome::Accept { new_count } => {
                let mut ev = Self::base("accept", chat_id);
                ev.count = Some(new_count);
                ev
            }
            Outcome::Reject {
                broken_at,
                new_high_score,
                reason,
            } => {
                let mut ev = Self::base("reject", chat_id);
                ev.count = Some(broken_at);
                ev.high_score = new_high_score;
                ev.reason = Some(describe_break(&reason));
                ev
            }
        };
        ev.user_id = Some(user_id.0);
        ev.username = Some(username.to_string());
        ev.content = Some(content.to_string());
        Some(ev)
    }

    pub fn command(chat_id: ChatId, user_id: UserId, username: &str, command: &str) -> Self {
        let mut ev = Self::base("command", chat_id);
        ev.user_id = Some(user_id.0);
        ev.username = Some(username.to_string());
        ev.command = Some(command.to_string());
        ev
    }
}

pub fn describe_break(reason: &BreakReason) -> String {
    match reason {
        BreakReason::WrongNumber { expected, got } => {
            format!("wrong number: expected {expected}, got {got}")
        }
        BreakReason::SelfConsecutive => "same user counted twice in a row".to_string(),
    }
}

/// Append-only audit trail, plain text or JSON lines.
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        std::env::temp_dir().join(format!("{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
        assert_eq!(truncate_text("short", AUDIT_MAX_TEXT), "short");
    }

    #[test]
    fn ignored_messages_are_not_audited() {
        let ev = AuditEvent::outcome(ChatId(1), UserId(2), "u", "hi", &Outcome::Ignore);
        assert!(ev.is_none());
    }

    #[test]
    fn json_lines_contain_outcome_fields() {
        let log = AuditLogger::new(tmp_file("mochi-audit-json"), true);
        let outcome = Outcome::Reject {
            broken_at: 6,
            new_high_score: Some(6),
            reason: BreakReason::WrongNumber {
                expected: 7,
                got: 70,
            },
        };
        let ev = AuditEvent::outcome(ChatId(-5), UserId(9), "zoe", "70", &outcome).unwrap();
        log.write(ev).unwrap();
        log.write(AuditEvent::command(ChatId(-5), UserId(9), "zoe", "reset"))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "reject");
        assert_eq!(lines[0]["count"], 6);
        assert_eq!(lines[0]["high_score"], 6);
        assert_eq!(lines[0]["reason"], "wrong number: expected 7, got 70");
        assert_eq!(lines[1]["command"], "reset");
        assert!(lines[1].get("content").is_none());

        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn plain_format_truncates_content() {
        let log = AuditLogger::new(tmp_file("mochi-audit-plain"), false);
        let content = "1".repeat(AUDIT_MAX_TEXT + 1);
        let ev = AuditEvent::outcome(
            ChatId(1),
            UserId(1),
            "u",
            &content,
            &Outcome::Accept { new_count: 1 },
        )
        .unwrap();
        log.write(ev).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: accept"));
        assert!(written.contains("..."));
        assert!(!written.contains(&content));

        let _ = std::fs::remove_file(log.path());
    }
}
