use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the counting bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub bot_name: String,

    // Game behavior
    pub count_reaction: String,
    pub ignore_bots: bool,

    // Audit
    pub audit_log_enabled: bool,
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Outbound throttling
    pub throttle_global: Duration,
    pub throttle_per_chat: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").and_then(non_empty);
        let Some(telegram_bot_token) = telegram_bot_token else {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        };

        let bot_name = get("BOT_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "Counting Mochi".to_string());
        let count_reaction = get("COUNT_REACTION")
            .and_then(non_empty)
            .unwrap_or_else(|| "🍡".to_string());
        let ignore_bots = get("IGNORE_BOTS").map(|s| parse_bool(&s)).unwrap_or(true);

        let audit_log_enabled = get("AUDIT_LOG_ENABLED")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);
        let audit_log_path = PathBuf::from(
            get("AUDIT_LOG_PATH")
                .and_then(non_empty)
                .unwrap_or_else(|| "/tmp/counting-mochi-audit.log".to_string()),
        );
        let audit_log_json = get("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        // Telegram allows ~30 msg/sec globally and ~1 msg/sec per chat.
        let throttle_global = Duration::from_millis(
            get("THROTTLE_GLOBAL_MS")
                .and_then(|s| parse_u64(&s))
                .unwrap_or(40),
        );
        let throttle_per_chat = Duration::from_millis(
            get("THROTTLE_PER_CHAT_MS")
                .and_then(|s| parse_u64(&s))
                .unwrap_or(1050),
        );

        Ok(Self {
            telegram_bot_token,
            bot_name,
            count_reaction,
            ignore_bots,
            audit_log_enabled,
            audit_log_path,
            audit_log_json,
            throttle_global,
            throttle_per_chat,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.telegram_bot_token, "123:abc");
        assert_eq!(cfg.bot_name, "Counting Mochi");
        assert_eq!(cfg.count_reaction, "🍡");
        assert!(cfg.ignore_bots);
        assert!(!cfg.audit_log_enabled);
        assert!(!cfg.audit_log_json);
        assert_eq!(cfg.throttle_global, Duration::from_millis(40));
        assert_eq!(cfg.throttle_per_chat, Duration::from_millis(1050));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("BOT_NAME", "Counter"),
            ("IGNORE_BOTS", "off"),
            ("AUDIT_LOG_ENABLED", "YES"),
            ("AUDIT_LOG_JSON", "1"),
            ("AUDIT_LOG_PATH", "/var/log/mochi.log"),
            ("THROTTLE_PER_CHAT_MS", " 500 "),
            ("THROTTLE_GLOBAL_MS", "nope"),
        ]))
        .unwrap();
        assert_eq!(cfg.bot_name, "Counter");
        assert!(!cfg.ignore_bots);
        assert!(cfg.audit_log_enabled);
        assert!(cfg.audit_log_json);
        assert_eq!(cfg.audit_log_path, PathBuf::from("/var/log/mochi.log"));
        assert_eq!(cfg.throttle_per_chat, Duration::from_millis(500));
        assert_eq!(cfg.throttle_global, Duration::from_millis(40));
    }

    #[test]
    fn dotenv_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"abc\"\n\nBOT_NAME='Mochi'\nbroken line\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc".to_string()),
                ("BOT_NAME".to_string(), "Mochi".to_string()),
            ]
        );
    }
}
