use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, CATEGORY_COMMANDS, NO_ARG_COMMANDS, PATH_TEXT_COMMANDS, RAW_ARG_COMMANDS,
    SINGLE_PATH_COMMANDS, TIER_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StudioCommand {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub args: BTreeMap<String, Value>,
}

impl StudioCommand {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.args
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    fn with_prompt(mut self, prompt: &str) -> Self {
        let trimmed = prompt.trim();
        if !trimmed.is_empty() {
            self.prompt = Some(trimmed.to_string());
        }
        self
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_spec(command: &str, specs: &[CommandSpec]) -> Option<CommandSpec> {
    specs.iter().find(|spec| spec.command == command).copied()
}

/// Shell-style unquoting of a lone path; unbalanced quotes fall back to
/// whitespace words.
fn single_path(arg: &str) -> String {
    let words = shell_words::split(arg)
        .unwrap_or_else(|_| arg.split_whitespace().map(str::to_string).collect());
    words
        .into_iter()
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First shell word is the path, the remainder (verbatim) is the prompt.
fn parse_path_and_text(arg: &str) -> (String, String) {
    let trimmed = arg.trim();
    if let Some(rest) = trimmed.strip_prefix('"').or_else(|| trimmed.strip_prefix('\'')) {
        let quote = if trimmed.starts_with('"') { '"' } else { '\'' };
        if let Some(end) = rest.find(quote) {
            return (rest[..end].to_string(), rest[end + 1..].trim().to_string());
        }
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((path, text)) => (path.to_string(), text.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub fn parse_command(text: &str) -> StudioCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return StudioCommand::new("noop", text);
    }

    if let Some(tail) = raw_trimmed.strip_prefix('/') {
        let name_end = tail
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(tail.len());
        if name_end > 0 {
            let (name, rest) = tail.split_at(name_end);
            let command = name.to_ascii_lowercase();
            let arg = rest.trim();

            if let Some(spec) = find_spec(&command, RAW_ARG_COMMANDS) {
                let mut parsed = StudioCommand::new(spec.action, text).with_arg("value", arg);
                if spec.action == "set_option" {
                    parsed = parsed.with_arg("option", spec.key);
                }
                return parsed;
            }

            if TIER_COMMANDS.iter().any(|value| *value == command) {
                return StudioCommand::new("set_tier", text).with_arg("tier", command);
            }

            if let Some(spec) = find_spec(&command, CATEGORY_COMMANDS) {
                return StudioCommand::new(spec.action, text)
                    .with_arg("category", spec.key)
                    .with_prompt(arg);
            }

            if let Some(spec) = find_spec(&command, PATH_TEXT_COMMANDS) {
                let (path, prompt) = parse_path_and_text(arg);
                return StudioCommand::new(spec.action, text)
                    .with_arg(spec.key, path)
                    .with_prompt(&prompt);
            }

            if let Some(spec) = find_spec(&command, SINGLE_PATH_COMMANDS) {
                return StudioCommand::new(spec.action, text)
                    .with_arg(spec.key, single_path(arg));
            }

            if let Some(spec) = find_spec(&command, NO_ARG_COMMANDS) {
                return StudioCommand::new(spec.action, text);
            }

            return StudioCommand::new("unknown", text)
                .with_arg("command", command)
                .with_arg("arg", arg);
        }
    }

    StudioCommand::new("generate", text).with_prompt(raw_trimmed)
}
