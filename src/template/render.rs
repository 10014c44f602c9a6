use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::error::TemplateError;

/// Placeholder name to value mapping used to instantiate a script template
///
/// A token can be inserted without a value. Rendering refuses to run while any token is unset
/// (or set to an empty string), so a script is never produced with a hole in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenMap {
    tokens: BTreeMap<String, Option<String>>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tokens.insert(key.into(), Some(value.into()));
    }

    /// Insert a token that may not have a value yet
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<String>) {
        self.tokens.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tokens.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tokens.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\\?\{\s*([A-Za-z_][A-Za-z0-9_]*)(?:\.[^}|\s]*)?\s*(?:\|[^}]*)?\}").expect("Valid placeholder regex")
    })
}

/// The root name of every unescaped placeholder in `text`, in order of appearance
///
/// `{NAME}`, `{NAME.field}` and `{NAME | formatter}` all yield `NAME`. Escaped braces (`\{`)
/// are literal text and don't count.
pub fn placeholders(text: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(text)
        .filter(|caps| !caps[0].starts_with('\\'))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Render a template with TinyTemplate
///
/// Checks run before anything is substituted: first every token must have a non-empty value,
/// then every placeholder in the template must have a token. Values are inserted verbatim
/// (no HTML escaping, these are shell scripts).
pub fn render(template: &str, tokens: &TokenMap) -> Result<String, TemplateError> {
    for (key, value) in &tokens.tokens {
        if value.as_deref().map_or(true, str::is_empty) {
            warn!("Token {key} has no value");
            return Err(TemplateError::MissingToken(key.clone()));
        }
    }

    if let Some(name) = placeholders(template).into_iter().find(|p| !tokens.contains(p)) {
        warn!("Template placeholder {name} is unbound");
        return Err(TemplateError::UnboundPlaceholder(name));
    }

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("script", template)
        .map_err(|err| TemplateError::Parse(err.to_string()))?;

    debug!("Rendering template with {} tokens", tokens.len());
    tt.render("script", tokens)
        .map_err(|err| TemplateError::Render(err.to_string()))
}
