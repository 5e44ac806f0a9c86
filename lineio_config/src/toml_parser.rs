use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;

/// Simple TOML parser for configuration files
/// Supports the flat `[section]` + `key = value` subset lineio needs
pub struct TomlParser;

impl TomlParser {
    /// Parse a TOML string into a map of dotted keys (`section.key`)
    pub fn parse(content: &str) -> ConfigResult<HashMap<String, TomlValue>> {
        let mut result = HashMap::new();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = strip_comment(line).trim();

            if line.is_empty() {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = section.trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Toml(format!(
                    "Invalid line {}: '{}'",
                    line_num + 1,
                    line
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Toml(format!("Missing key on line {}", line_num + 1)));
            }
            let full_key = if current_section.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", current_section, key)
            };

            result.insert(full_key, Self::parse_value(value)?);
        }

        Ok(result)
    }

    /// Unescape the body of a basic string; `content` starts after the
    /// opening quote and must end at the closing one.
    fn parse_basic_string(content: &str, raw: &str) -> ConfigResult<String> {
        let invalid = || ConfigError::Toml(format!("Invalid string: '{}'", raw));
        let mut out = String::with_capacity(content.len());
        let mut chars = content.chars();

        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    return if chars.as_str().is_empty() {
                        Ok(out)
                    } else {
                        Err(invalid())
                    };
                }
                '\\' => match chars.next() {
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    _ => return Err(invalid()),
                },
                c => out.push(c),
            }
        }

        // no closing quote
        Err(invalid())
    }

    fn parse_value(value: &str) -> ConfigResult<TomlValue> {
        let value = value.trim();

        if let Some(content) = value.strip_prefix('"') {
            Ok(TomlValue::String(Self::parse_basic_string(content, value)?))
        } else if value == "true" {
            Ok(TomlValue::Bool(true))
        } else if value == "false" {
            Ok(TomlValue::Bool(false))
        } else if let Ok(int_val) = value.replace('_', "").parse::<i64>() {
            Ok(TomlValue::Integer(int_val))
        } else {
            Err(ConfigError::Toml(format!("Unsupported value: '{}'", value)))
        }
    }
}

/// Drop a trailing `# comment` that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Escape a string for a TOML basic string, without the surrounding quotes.
pub fn escape_basic_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// TOML value types supported by our parser
#[derive(Debug, Clone, PartialEq)]
pub enum TomlValue {
    String(String),
    Integer(i64),
    Bool(bool),
}

impl TomlValue {
    /// Get value as string or return error
    pub fn as_string(&self) -> ConfigResult<&str> {
        match self {
            TomlValue::String(s) => Ok(s),
            _ => Err(ConfigError::Validation("Expected string value".to_string())),
        }
    }

    /// Get value as integer or return error
    pub fn as_integer(&self) -> ConfigResult<i64> {
        match self {
            TomlValue::Integer(i) => Ok(*i),
            _ => Err(ConfigError::Validation(
                "Expected integer value".to_string(),
            )),
        }
    }

    /// Get value as boolean or return error
    pub fn as_bool(&self) -> ConfigResult<bool> {
        match self {
            TomlValue::Bool(b) => Ok(*b),
            _ => Err(ConfigError::Validation(
                "Expected boolean value".to_string(),
            )),
        }
    }
}
