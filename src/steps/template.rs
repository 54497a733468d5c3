use crate::error::ConfigurationError;
use crate::graph::VariableRegistry;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^}]*?)\s*\}\}").expect("placeholder pattern is valid")
});

/// Names referenced by `{{name}}` placeholders, in order of appearance.
///
/// An unterminated `{{` is treated as literal text.
pub fn placeholders(text: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|name| name.as_str())
        .collect()
}

/// Renders message text as a backtick template literal, turning each `{{name}}`
/// into `${name}` after checking `name` can be resolved.
pub fn render(text: &str, variables: &VariableRegistry) -> Result<String, ConfigurationError> {
    let mut out = String::from("`");
    let mut last = 0;
    for cap in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if !variables.is_resolvable(name) {
            return Err(ConfigurationError::UnknownVariable(name.to_string()));
        }
        escape_into(&mut out, &text[last..whole.start()]);
        out.push_str("${");
        out.push_str(name);
        out.push('}');
        last = whole.end();
    }
    escape_into(&mut out, &text[last..]);
    out.push('`');
    Ok(out)
}

fn escape_into(out: &mut String, literal: &str) {
    for c in literal.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            other => out.push(other),
        }
    }
}
