// Logging utilities
// Structured logging with JSON and human-readable formats

use log::Level;
use serde_json::json;

/// Tags lifted out of a message into structured fields, in the order they usually appear.
const LOG_TAGS: [&str; 2] = ["PHASE", "STEP"];

/// Mask an API key or similar secret for logging.
pub fn mask_secret(input: &str) -> String {
    let chars: Vec<char> = input.trim().chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Drop query strings and userinfo from a URL so keys passed as parameters never reach a log line.
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url.trim()) {
        Ok(mut u) => {
            let _ = u.set_username("");
            let _ = u.set_password(None);
            u.set_query(None);
            u.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Shorten free text (transcripts, descriptions) for log lines without splitting a character.
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// Split `[PHASE: ...]` and `[STEP: ...]` tags out of a log message.
/// Returns `(phase, step, remaining_message)`.
pub fn split_log_tags(message: &str) -> (Option<String>, Option<String>, String) {
    let mut found: [Option<String>; 2] = [None, None];
    let mut remaining = message.to_string();

    for (slot, tag) in LOG_TAGS.iter().enumerate() {
        let open = format!("[{}:", tag);
        let Some(start) = remaining.find(&open) else {
            continue;
        };
        let Some(len) = remaining[start..].find(']') else {
            continue;
        };
        let value = remaining[start + open.len()..start + len].trim().to_string();
        found[slot] = Some(value);
        remaining = format!("{} {}", &remaining[..start], &remaining[start + len + 1..])
            .trim()
            .to_string();
    }

    let [phase, step] = found;
    (phase, step, remaining)
}

/// Format log entry as JSON for structured logging
pub fn format_json_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": message,
    });

    if let Some(phase) = phase {
        entry["phase"] = json!(phase);
    }
    if let Some(step) = step {
        entry["step"] = json!(step);
    }

    serde_json::to_string(&entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut line = format!("[{}] [{}]", timestamp, level.as_str());

    if let Some(phase) = phase {
        line.push_str(&format!(" [PHASE: {}]", phase));
    }
    if let Some(step) = step {
        line.push_str(&format!(" [STEP: {}]", step));
    }

    line.push_str(&format!(" [{}] {}", target, message));
    line
}
