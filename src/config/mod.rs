use crate::autosave::DEFAULT_AUTOSAVE_MS;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:6689";

/// How the note editor is hosted.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EditorMode {
    /// The editor owns a route; leaving with an empty note deletes it.
    #[default]
    Routed,
    /// Inline editor opened by an explicit "create note" action; never deletes on exit.
    Embedded,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnvConfig {
    pub api_url: String,
    pub autosave_ms: u64,
    pub editor_mode: EditorMode,
}

impl EnvConfig {
    /// Read `window.ENV`, falling back to defaults for anything missing.
    pub fn new() -> Self {
        match window_env() {
            Some(env) => Self::from_json(&env),
            None => Self::default(),
        }
    }

    /// Both the upper-case keys (documented) and lower-case keys (legacy) are accepted.
    pub fn from_json(env: &serde_json::Value) -> Self {
        let lookup = |upper: &str, lower: &str| env.get(upper).or_else(|| env.get(lower));

        let api_url = lookup("API_URL", "api_url")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // Accept numbers and numeric strings; nonsense falls back to the default.
        let autosave_ms = lookup("AUTOSAVE_MS", "autosave_ms")
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_AUTOSAVE_MS);

        let editor_mode = match lookup("EDITOR_MODE", "editor_mode").and_then(|v| v.as_str()) {
            Some(s) => EditorMode::from_str(s.trim()).unwrap_or_else(|_| {
                tracing::warn!(value = s, "unknown editor mode, using routed");
                EditorMode::Routed
            }),
            None => EditorMode::Routed,
        };

        Self {
            api_url,
            autosave_ms,
            editor_mode,
        }
    }

    pub fn editor(&self) -> EditorConfig {
        EditorConfig {
            autosave_delay: Duration::from_millis(self.autosave_ms),
            mode: self.editor_mode,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            autosave_ms: DEFAULT_AUTOSAVE_MS,
            editor_mode: EditorMode::Routed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    pub autosave_delay: Duration,
    pub mode: EditorMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EnvConfig::default().editor()
    }
}

fn window_env() -> Option<serde_json::Value> {
    let window = web_sys::window()?;
    let env = window.get("ENV")?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }

    let json = js_sys::JSON::stringify(&env).ok()?.as_string()?;
    match serde_json::from_str(&json) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "window.ENV is not plain JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_env_is_empty() {
        let c = EnvConfig::from_json(&json!({}));
        assert_eq!(c, EnvConfig::default());
        assert_eq!(c.editor().autosave_delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_upper_case_keys_win() {
        let c = EnvConfig::from_json(&json!({
            "API_URL": "https://kb.example.org",
            "api_url": "http://ignored",
            "AUTOSAVE_MS": "500",
            "editor_mode": "Embedded",
        }));
        assert_eq!(c.api_url, "https://kb.example.org");
        assert_eq!(c.autosave_ms, 500);
        assert_eq!(c.editor_mode, EditorMode::Embedded);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let c = EnvConfig::from_json(&json!({
            "api_url": "  ",
            "autosave_ms": 0,
            "EDITOR_MODE": "floating",
        }));
        assert_eq!(c, EnvConfig::default());
    }
}
