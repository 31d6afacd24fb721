//! # Environment Templating
//!
//! Both the configuration file and every manifest are rendered against the
//! process environment before use. The syntax is a small subset of Go-style
//! actions, which is what existing deployment repositories are written in:
//!
//! - `{{ .NAME }}` inserts the value of `NAME`.
//! - `{{ ToUpper .NAME }}`, `{{ ToLower .NAME }}`, `{{ Title .NAME }}`
//! - `{{ TrimPrefix "prefix" .NAME }}`, `{{ TrimSuffix "suffix" .NAME }}`
//! - `{{ Replace "from" "to" .NAME }}`
//!
//! A variable that is not in the map renders as [`NO_VALUE`]. Arguments can be
//! variables or double-quoted literals.

use std::collections::HashMap;
use std::env;

use regex::Regex;

use crate::defaults::NO_VALUE;
use crate::error::{Error, Result};

/// Variables available to a template.
pub type EnvMap = HashMap<String, String>;

/// Snapshot the process environment. Entries that are not valid UTF-8 are skipped.
pub fn env_to_map() -> EnvMap {
    env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Render `template`, replacing every `{{ ... }}` action.
pub fn render(template: &str, vars: &EnvMap) -> Result<String> {
    let action = Regex::new(r"\{\{-?\s*(.*?)\s*-?\}\}")?;
    let tokenizer = Regex::new(r#""(?:[^"\\]|\\.)*"|\S+"#)?;

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in action.captures_iter(template) {
        let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        let tokens: Vec<&str> = tokenizer
            .find_iter(expr.as_str())
            .map(|m| m.as_str())
            .collect();
        out.push_str(&evaluate(&tokens, vars)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn evaluate(tokens: &[&str], vars: &EnvMap) -> Result<String> {
    let Some((head, args)) = tokens.split_first() else {
        return Err(Error::Template {
            message: "empty action".to_string(),
            variable: None,
        });
    };

    if args.is_empty() && (head.starts_with('.') || head.starts_with('"')) {
        return argument(head, vars);
    }

    let values = args
        .iter()
        .map(|arg| argument(arg, vars))
        .collect::<Result<Vec<_>>>()?;

    match (*head, values.as_slice()) {
        ("ToUpper", [s]) => Ok(s.to_uppercase()),
        ("ToLower", [s]) => Ok(s.to_lowercase()),
        ("Title", [s]) => Ok(title(s)),
        ("TrimPrefix", [prefix, s]) => Ok(s.strip_prefix(prefix.as_str()).unwrap_or(s).to_string()),
        ("TrimSuffix", [suffix, s]) => Ok(s.strip_suffix(suffix.as_str()).unwrap_or(s).to_string()),
        ("Replace", [from, to, s]) => Ok(s.replace(from.as_str(), to)),
        ("ToUpper" | "ToLower" | "Title" | "TrimPrefix" | "TrimSuffix" | "Replace", _) => {
            Err(Error::Template {
                message: format!("wrong number of arguments ({}) for {}", values.len(), head),
                variable: Some(head.to_string()),
            })
        }
        _ => Err(Error::Template {
            message: "unknown function".to_string(),
            variable: Some(head.to_string()),
        }),
    }
}

fn argument(token: &str, vars: &EnvMap) -> Result<String> {
    if let Some(name) = token.strip_prefix('.') {
        return Ok(vars.get(name).cloned().unwrap_or_else(|| NO_VALUE.to_string()));
    }
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        let inner = &token[1..token.len() - 1];
        return Ok(inner.replace("\\\"", "\"").replace("\\\\", "\\"));
    }

    Err(Error::Template {
        message: format!("expected a variable or a quoted string, got {}", token),
        variable: None,
    })
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !ch.is_alphanumeric();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn vars(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_plain_text_untouched() {
        let out = render("kind: Service\nname: web\n", &EnvMap::new()).unwrap();
        assert_eq!(out, "kind: Service\nname: web\n");
    }

    #[test]
    fn test_render_variable() {
        let env = vars(&[("TAG", "abc123"), ("NAMESPACE", "dev")]);
        let out = render("image: app:{{ .TAG }} # {{.NAMESPACE}}", &env).unwrap();
        assert_eq!(out, "image: app:abc123 # dev");
    }

    #[test]
    fn test_render_missing_variable_is_no_value() {
        let out = render("namespace: {{ .UNSET }}", &EnvMap::new()).unwrap();
        assert_eq!(out, "namespace: <no value>");
    }

    #[test]
    fn test_render_functions() {
        let env = vars(&[("BRANCH", "feature/Login-Page")]);
        assert_eq!(render("{{ ToLower .BRANCH }}", &env).unwrap(), "feature/login-page");
        assert_eq!(render("{{ ToUpper .BRANCH }}", &env).unwrap(), "FEATURE/LOGIN-PAGE");
        assert_eq!(
            render(r#"{{ TrimPrefix "feature/" .BRANCH }}"#, &env).unwrap(),
            "Login-Page"
        );
        assert_eq!(
            render(r#"{{ TrimSuffix "-Page" .BRANCH }}"#, &env).unwrap(),
            "feature/Login"
        );
        assert_eq!(
            render(r#"{{ Replace "/" "-" .BRANCH }}"#, &env).unwrap(),
            "feature-Login-Page"
        );
    }

    #[test]
    fn test_render_title() {
        let env = vars(&[("NAME", "hello big world")]);
        assert_eq!(render("{{ Title .NAME }}", &env).unwrap(), "Hello Big World");
    }

    #[test]
    fn test_render_unknown_function_fails() {
        let err = render("{{ Frobnicate .X }}", &EnvMap::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Template { variable: Some(ref v), .. } if v == "Frobnicate"
        ));
    }

    #[test]
    fn test_render_wrong_arity_fails() {
        let err = render(r#"{{ Replace "a" .X }}"#, &EnvMap::new()).unwrap_err();
        assert!(err.to_string().contains("wrong number of arguments"));
    }

    #[test]
    fn test_render_empty_action_fails() {
        assert!(render("{{ }}", &EnvMap::new()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_to_map_snapshots_process_environment() {
        let map = env_to_map();
        for (key, value) in env::vars() {
            assert_eq!(map.get(&key), Some(&value));
        }
    }
}
