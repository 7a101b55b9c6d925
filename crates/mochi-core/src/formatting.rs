//! Formatting utilities for Telegram HTML parse mode.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `@name` mention, escaped. Leading `@` in the input is not doubled.
pub fn mention(display_name: &str) -> String {
    let name = display_name.trim().trim_start_matches('@');
    if name.is_empty() {
        return "@someone".to_string();
    }
    format!("@{}", escape_html(name))
}
