//! The command dispatcher.
//!
//! Stateless per call: parse one compound line, resolve the target through
//! the registries, drive the operation engine for each sub-command, return
//! status text. A failing sub-command is reported and the rest of the line
//! still runs; only an unresolvable target voids the whole line (it never
//! started).

use crate::engine::{self, ExecContext};
use crate::verbs::Verb;
use std::sync::Mutex;
use vantage_core::{RuntimeError, TypedStack};

/// Split a compound command body into sub-command tokens.
///
/// Whitespace separates tokens only at parenthesis depth zero, so
/// `bring(int, rstack)` stays one token. An unbalanced parenthesis is a
/// malformed command.
pub fn split_subcommands(body: &str) -> Result<Vec<String>, RuntimeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    RuntimeError::MalformedCommand("unbalanced `)`".to_string())
                })?;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if depth != 0 {
        return Err(RuntimeError::MalformedCommand(
            "missing closing parenthesis".to_string(),
        ));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Run a body of sub-commands against one stack, left to right. Errors
/// become `error:` lines and processing continues with the next
/// sub-command.
pub fn run_subcommands(
    body: &str,
    target: &Mutex<TypedStack>,
    ctx: &ExecContext,
) -> Vec<String> {
    let tokens = match split_subcommands(body) {
        Ok(tokens) => tokens,
        Err(err) => return vec![format!("error: {}", err)],
    };
    let mut out = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let status =
            Verb::parse(token).and_then(|verb| engine::execute(&verb, target, ctx));
        match status {
            Ok(line) => out.push(line),
            Err(err) => out.push(format!("error: {}", err)),
        }
    }
    out
}

/// Dispatch one selector line: `@<name>: <sub-commands>`.
///
/// A stack target runs synchronously; a spawn target gets the body
/// deposited as a script. Stacks shadow spawns when both carry the name.
pub fn dispatch_line(line: &str, ctx: &ExecContext) -> Vec<String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('@') else {
        return vec![format!(
            "error: {}",
            RuntimeError::MalformedCommand(
                "a command line starts with `@<name>:`".to_string()
            )
        )];
    };
    let Some((name, body)) = rest.split_once(':') else {
        return vec![format!(
            "error: {}",
            RuntimeError::MalformedCommand(
                "missing `:` after the target name".to_string()
            )
        )];
    };
    let name = name.trim();
    if name.is_empty() {
        return vec![format!(
            "error: {}",
            RuntimeError::MalformedCommand("the target name is empty".to_string())
        )];
    }

    if let Some(stack) = ctx.stacks.resolve(name) {
        return run_subcommands(body, &stack, ctx);
    }

    if let Some(tasks) = ctx.tasks.upgrade() {
        if let Some(spawn) = tasks.resolve(name) {
            spawn.deposit(body.trim().to_string());
            return vec![format!("{}: script deposited", name)];
        }
    }

    vec![format!(
        "error: {}",
        RuntimeError::UnknownTarget(name.to_string())
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_respects_paren_depth() {
        let tokens = split_subcommands("push:1 bring(int, rstack) add").unwrap();
        assert_eq!(tokens, vec!["push:1", "bring(int, rstack)", "add"]);
    }

    #[test]
    fn splitting_collapses_extra_whitespace() {
        let tokens = split_subcommands("  push:1   pop  ").unwrap();
        assert_eq!(tokens, vec!["push:1", "pop"]);
        assert!(split_subcommands("").unwrap().is_empty());
    }

    #[test]
    fn unbalanced_parens_are_malformed() {
        assert!(matches!(
            split_subcommands("bring(int, rstack"),
            Err(RuntimeError::MalformedCommand(_))
        ));
        assert!(matches!(
            split_subcommands("push:1)"),
            Err(RuntimeError::MalformedCommand(_))
        ));
    }
}
