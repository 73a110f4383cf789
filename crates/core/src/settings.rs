//! Settings values and the `settings.txt` text format.
//!
//! The backend exposes settings as a flat JSON object (`/settings_json`)
//! whose values are strings, numbers, booleans or lists of strings. The
//! same data is persisted server-side as a line-oriented text file:
//!
//! ```text
//! # comment
//! REMOTE_HOST=login04
//! REMOTE_COMMANDS=
//! module load python
//! phd run -ng 1 python script.py
//! ```
//!
//! A `KEY=` line followed by bare lines forms a list. A key that ends up
//! with exactly one value is read back as a scalar, so a one-item list
//! does not survive a text round trip as a list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ordered settings object, keyed by field name.
pub type Settings = IndexMap<String, SettingValue>;

/// A single settings value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
}

impl SettingValue {
    /// Membership in the checkbox truthy set `{true, "true", 1, "1"}`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64() == Some(1.0),
            Self::Text(s) => s == "true" || s == "1",
            Self::List(_) => false,
        }
    }

    /// Text shown in a single-line or multi-line field.
    ///
    /// Lists are joined with `\n`.
    pub fn to_field_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => join_lines(items),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Split multi-line field text into list items, dropping blank lines.
///
/// Accepts both `\n` and `\r\n` line breaks.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list items for display in a multi-line field.
pub fn join_lines(items: &[String]) -> String {
    items.join("\n")
}

/// Parse the `settings.txt` format into an ordered settings object.
///
/// Keys and values are trimmed; blank lines and `#` comments are
/// skipped. A bare line before the first key is rejected.
pub fn parse_settings_text(text: &str) -> Result<Settings, CoreError> {
    let mut settings = Settings::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            if let Some((k, values)) = current.take() {
                settings.insert(k, collapse(values));
            }
            let value = value.trim();
            let values = if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            };
            current = Some((key.trim().to_string(), values));
        } else {
            match current.as_mut() {
                Some((_, values)) => values.push(line.to_string()),
                None => {
                    return Err(CoreError::Parse(format!(
                        "line {}: value without a key",
                        lineno + 1
                    )))
                }
            }
        }
    }

    if let Some((k, values)) = current {
        settings.insert(k, collapse(values));
    }

    Ok(settings)
}

fn collapse(mut values: Vec<String>) -> SettingValue {
    if values.len() == 1 {
        SettingValue::Text(values.remove(0))
    } else {
        SettingValue::List(values)
    }
}

/// Render a settings object in the `settings.txt` format.
///
/// Lists become a `KEY=` line followed by one line per item. The output
/// always ends with a newline.
pub fn render_settings_text(settings: &Settings) -> String {
    let mut lines = Vec::with_capacity(settings.len());
    for (key, value) in settings {
        match value {
            SettingValue::List(items) => {
                lines.push(format!("{key}="));
                lines.extend(items.iter().cloned());
            }
            scalar => lines.push(format!("{key}={}", scalar.to_field_text())),
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn truthy_set() {
        assert!(SettingValue::Bool(true).is_truthy());
        assert!(SettingValue::from("true").is_truthy());
        assert!(SettingValue::from("1").is_truthy());
        assert!(SettingValue::Number(1.into()).is_truthy());
        let one_point_zero: SettingValue = serde_json::from_str("1.0").unwrap();
        assert!(one_point_zero.is_truthy());

        assert!(!SettingValue::Bool(false).is_truthy());
        assert!(!SettingValue::from("True").is_truthy());
        assert!(!SettingValue::from("yes").is_truthy());
        assert!(!SettingValue::Number(2.into()).is_truthy());
        assert!(!SettingValue::List(vec!["true".into()]).is_truthy());
    }

    #[test]
    fn split_drops_empty_lines() {
        assert_eq!(split_lines("a\nb\n\nc"), ["a", "b", "c"]);
        assert_eq!(split_lines("a\r\nb\r\n\r\n"), ["a", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "DELETE_FILES": true,
                "REMOTE_PORT": 22,
                "REMOTE_HOST": "login04",
                "REMOTE_COMMANDS": ["ls", "pwd"]
            }"#,
        )
        .unwrap();

        assert_eq!(settings["DELETE_FILES"], SettingValue::Bool(true));
        assert_eq!(settings["REMOTE_PORT"], SettingValue::Number(22.into()));
        assert_eq!(settings["REMOTE_HOST"], SettingValue::from("login04"));
        assert_eq!(
            settings["REMOTE_COMMANDS"],
            SettingValue::List(vec!["ls".into(), "pwd".into()])
        );
        let keys: Vec<_> = settings.keys().cloned().collect();
        assert_eq!(keys, ["DELETE_FILES", "REMOTE_PORT", "REMOTE_HOST", "REMOTE_COMMANDS"]);
    }

    #[test]
    fn parse_text_with_lists_and_comments() {
        let text = "\
# ETX settings
REMOTE_HOST = login04
REMOTE_COMMANDS=
module load python

phd run -ng 1 python script.py
EMPTY_LIST=
DELETE_FILES=true
";
        let settings = parse_settings_text(text).unwrap();
        assert_eq!(settings["REMOTE_HOST"], SettingValue::from("login04"));
        assert_eq!(
            settings["REMOTE_COMMANDS"],
            SettingValue::List(vec![
                "module load python".into(),
                "phd run -ng 1 python script.py".into()
            ])
        );
        assert_eq!(settings["EMPTY_LIST"], SettingValue::List(vec![]));
        assert_eq!(settings["DELETE_FILES"], SettingValue::from("true"));
    }

    #[test]
    fn parse_rejects_orphan_value() {
        assert_matches!(
            parse_settings_text("orphan\nKEY=v"),
            Err(CoreError::Parse(msg)) if msg.contains("line 1")
        );
    }

    #[test]
    fn render_then_parse_preserves_multi_item_lists() {
        let mut settings = Settings::new();
        settings.insert("REMOTE_USER".into(), "alice".into());
        settings.insert("DELETE_FILES".into(), true.into());
        settings.insert(
            "REMOTE_COMMANDS".into(),
            vec!["ls".to_string(), "pwd".to_string()].into(),
        );

        let text = render_settings_text(&settings);
        assert_eq!(
            text,
            "REMOTE_USER=alice\nDELETE_FILES=true\nREMOTE_COMMANDS=\nls\npwd\n"
        );

        let parsed = parse_settings_text(&text).unwrap();
        assert_eq!(parsed["REMOTE_USER"], SettingValue::from("alice"));
        assert_eq!(parsed["DELETE_FILES"], SettingValue::from("true"));
        assert_eq!(parsed["REMOTE_COMMANDS"], settings["REMOTE_COMMANDS"]);
    }
}
