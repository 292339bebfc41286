//! Just enough of the GLSL preprocessor to resolve the conditional blocks the
//! distance-field shaders use.

use std::collections::BTreeMap;

/// Result of running the directives over a source string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Preprocessed {
    /// Body of the `#version` directive, e.g. `"300 es"`.
    pub version: Option<String>,
    /// `(name, behavior)` for every active `#extension` line.
    pub extensions: Vec<(String, String)>,
    pub defines: BTreeMap<String, String>,
    /// Source lines that survived conditional compilation, directives removed.
    pub text: String,
}

struct Conditional {
    /// Whether the enclosing block was active.
    parent: bool,
    /// Whether the current branch is taken.
    taken: bool,
    seen_else: bool,
}

pub(crate) fn preprocess(source: &str) -> Result<Preprocessed, String> {
    let source = strip_comments(source);
    let mut out = Preprocessed::default();
    let mut stack: Vec<Conditional> = Vec::new();
    let mut seen_code = false;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        let active = stack.last().is_none_or(|c| c.parent && c.taken);

        let Some(directive) = trimmed.strip_prefix('#') else {
            if active && !trimmed.is_empty() {
                seen_code = true;
                out.text.push_str(line);
                out.text.push('\n');
            }
            continue;
        };

        let directive = directive.trim_start();
        let (name, rest) = directive
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((directive, ""));

        match name {
            "ifdef" | "ifndef" => {
                let defined = out.defines.contains_key(rest);
                stack.push(Conditional {
                    parent: active,
                    taken: if name == "ifdef" { defined } else { !defined },
                    seen_else: false,
                });
            }
            "if" => {
                let taken = evaluate_condition(rest, &out.defines)
                    .map_err(|e| format!("{line_no}: {e}"))?;
                stack.push(Conditional {
                    parent: active,
                    taken,
                    seen_else: false,
                });
            }
            "else" => {
                let Some(top) = stack.last_mut() else {
                    return Err(format!("{line_no}: #else without #if"));
                };
                if top.seen_else {
                    return Err(format!("{line_no}: duplicate #else"));
                }
                top.seen_else = true;
                top.taken = !top.taken;
            }
            "endif" => {
                if stack.pop().is_none() {
                    return Err(format!("{line_no}: #endif without #if"));
                }
            }
            _ if !active => {}
            "version" => {
                if seen_code
                    || out.version.is_some()
                    || !out.defines.is_empty()
                    || !out.extensions.is_empty()
                {
                    return Err(format!(
                        "{line_no}: #version must occur before anything else"
                    ));
                }
                out.version = Some(rest.split_whitespace().collect::<Vec<_>>().join(" "));
            }
            "extension" => {
                let (ext, behavior) = rest
                    .split_once(':')
                    .ok_or_else(|| format!("{line_no}: malformed #extension '{rest}'"))?;
                out.extensions
                    .push((ext.trim().to_string(), behavior.trim().to_string()));
            }
            "define" => {
                let (macro_name, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(n, v)| (n, v.trim()))
                    .unwrap_or((rest, ""));
                if macro_name.is_empty() || macro_name.contains('(') {
                    return Err(format!("{line_no}: unsupported #define '{rest}'"));
                }
                out.defines.insert(macro_name.to_string(), value.to_string());
            }
            "undef" => {
                out.defines.remove(rest);
            }
            "error" => return Err(format!("{line_no}: #error {rest}")),
            "pragma" | "line" | "" => {}
            other => return Err(format!("{line_no}: unknown directive #{other}")),
        }
    }

    if !stack.is_empty() {
        return Err("unterminated conditional block".to_string());
    }
    Ok(out)
}

/// `#if` expressions: an integer literal, `defined(NAME)` or `!defined(NAME)`.
fn evaluate_condition(expr: &str, defines: &BTreeMap<String, String>) -> Result<bool, String> {
    let expr = expr.trim();
    if let Ok(value) = expr.parse::<i64>() {
        return Ok(value != 0);
    }
    let (negated, expr) = match expr.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, expr),
    };
    let name = expr
        .strip_prefix("defined")
        .map(str::trim)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
        .ok_or_else(|| format!("unsupported #if expression '{expr}'"))?;
    Ok(defines.contains_key(name) != negated)
}

/// Replace comments with whitespace, keeping line breaks.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Identifier tokens of `text`.
pub(crate) fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| t.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_'))
}

/// Statements at global scope; function and struct bodies are skipped.
pub(crate) fn global_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => {
                depth += 1;
                current.clear();
            }
            '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                let statement = normalize(&current);
                if !statement.is_empty() {
                    statements.push(statement);
                }
                current.clear();
            }
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }
    statements
}

fn normalize(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "../../../tests/unit/device/software/preprocess.rs"]
mod tests;
