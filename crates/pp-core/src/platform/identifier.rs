use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

/// Normalize what an operator typed into something `PlatformClient::resolve`
/// accepts: a bare public username, a numeric id or a canonical invite link.
///
/// Accepted forms: `@name`, `name`, `t.me/name`, `https://t.me/name`,
/// `https://telegram.me/s/name`, `-1001234567890`, and the invite links
/// `t.me/+hash` / `t.me/joinchat/hash` (both become `https://t.me/+hash`).
pub fn normalize_identifier(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::resolution(raw, "empty identifier"));
    }

    if trimmed.parse::<i64>().is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(caps) = invite_re().captures(trimmed) {
        return Ok(format!("https://t.me/+{}", &caps[1]));
    }
    if let Some(caps) = link_re().captures(trimmed) {
        return check_username(raw, &caps[1]);
    }
    if trimmed.contains('/') {
        return Err(Error::resolution(raw, "unsupported link"));
    }

    check_username(raw, trimmed.strip_prefix('@').unwrap_or(trimmed))
}

fn check_username(raw: &str, name: &str) -> Result<String> {
    if name_re().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(Error::resolution(raw, "not a valid public username"))
    }
}

fn invite_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:www\.)?(?:t|telegram)\.me/(?:\+|joinchat/)([A-Za-z0-9_-]+)/?$")
            .expect("valid regex")
    })
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:www\.)?(?:t|telegram)\.me/(?:s/)?([A-Za-z0-9_]+)/?(?:\?.*)?$")
            .expect("valid regex")
    })
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{3,31}$").expect("valid regex"))
}
