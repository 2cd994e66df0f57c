//! The verb set and sub-command parsing.
//!
//! Every operation the engine can perform is one case of `Verb`, so a
//! `match` over it is checked for exhaustiveness at compile time. A
//! sub-command token arrives in one of two interchangeable surface
//! syntaxes:
//!
//! ```text
//! op:arg            colon form, one literal argument
//! op(a, b, ...)     function form, comma-separated arguments
//! ```
//!
//! `bring` is special-cased: its two arguments (element type, source stack
//! name) are parsed before the general colon/function rule, so both
//! `bring:int,rstack` and `bring(int, rstack)` work.

use vantage_core::{RuntimeError, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    /// Push a literal, parsed as the target stack's element type.
    Push(String),
    Pop,
    Peek,
    Dup,
    Drop,
    Swap,
    Tuck,
    Over,
    Nip,
    Rot,
    Pick(usize),
    Roll(usize),
    Dup2,
    Drop2,
    Swap2,
    Over2,
    Depth,
    Print,
    Flip,
    Lifo,
    Fifo,
    Add,
    /// Numeric subtract, or strip-trailing-run on a text stack (`sub:x`).
    Sub(Option<String>),
    /// Numeric multiply, or string repeat on a text stack (`mul:3`).
    Mul(Option<String>),
    /// Numeric divide, or split-and-rejoin on a text stack (`div:,`).
    Div(Option<String>),
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Store(usize),
    Load(usize),
    Bring { elem: ValueType, source: String },
}

/// How the raw argument text arrived, before per-verb interpretation.
enum RawArgs {
    None,
    Colon(String),
    Call(Vec<String>),
}

/// Split a token into operation name and raw arguments.
fn split_parts(token: &str) -> Result<(String, RawArgs), RuntimeError> {
    if let Some(open) = token.find('(') {
        // `op(...)` unless a colon comes first, as in `push:(x)`.
        let colon_first = token.find(':').is_some_and(|c| c < open);
        if !colon_first {
            if !token.ends_with(')') {
                return Err(RuntimeError::MalformedCommand(format!(
                    "`{}` is missing a closing parenthesis",
                    token
                )));
            }
            let name = token[..open].to_string();
            let inner = &token[open + 1..token.len() - 1];
            let args = if inner.trim().is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(|a| a.trim().to_string()).collect()
            };
            return Ok((name, RawArgs::Call(args)));
        }
    }
    if let Some((name, arg)) = token.split_once(':') {
        return Ok((name.to_string(), RawArgs::Colon(arg.to_string())));
    }
    Ok((token.to_string(), RawArgs::None))
}

fn no_args(name: &str, args: &[String], verb: Verb) -> Result<Verb, RuntimeError> {
    if args.is_empty() {
        Ok(verb)
    } else {
        Err(RuntimeError::MalformedCommand(format!(
            "{} takes no argument",
            name
        )))
    }
}

fn index_arg(name: &str, args: &[String]) -> Result<usize, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::MalformedCommand(format!(
            "{} takes exactly one argument",
            name
        )));
    }
    args[0].parse::<usize>().map_err(|_| {
        RuntimeError::MalformedCommand(format!(
            "{} needs a non-negative integer, got `{}`",
            name, args[0]
        ))
    })
}

fn optional_arg(name: &str, args: Vec<String>) -> Result<Option<String>, RuntimeError> {
    match args.len() {
        0 => Ok(None),
        1 => Ok(args.into_iter().next()),
        _ => Err(RuntimeError::MalformedCommand(format!(
            "{} takes at most one argument",
            name
        ))),
    }
}

impl Verb {
    /// Resolve one sub-command token to a verb.
    pub fn parse(token: &str) -> Result<Verb, RuntimeError> {
        let (name, raw) = split_parts(token)?;
        if name.is_empty() {
            return Err(RuntimeError::MalformedCommand(format!(
                "`{}` has no operation name",
                token
            )));
        }
        let name_lc = name.to_ascii_lowercase();

        // bring's arguments are parsed ahead of the general rule: the
        // colon form carries both, comma-separated.
        if name_lc == "bring" {
            let args: Vec<String> = match raw {
                RawArgs::Colon(s) => s.split(',').map(|a| a.trim().to_string()).collect(),
                RawArgs::Call(v) => v,
                RawArgs::None => Vec::new(),
            };
            if args.len() != 2 {
                return Err(RuntimeError::MalformedCommand(
                    "bring takes a type and a source stack, e.g. bring(int, rstack)".to_string(),
                ));
            }
            let elem = ValueType::parse(&args[0]).ok_or_else(|| {
                RuntimeError::MalformedCommand(format!(
                    "`{}` is not an element type (int, float, text)",
                    args[0]
                ))
            })?;
            let source = args[1].trim_start_matches('@').to_string();
            if source.is_empty() {
                return Err(RuntimeError::MalformedCommand(
                    "bring needs a source stack name".to_string(),
                ));
            }
            return Ok(Verb::Bring { elem, source });
        }

        let args: Vec<String> = match raw {
            RawArgs::None => Vec::new(),
            RawArgs::Colon(s) => vec![s],
            RawArgs::Call(v) => v,
        };

        match name_lc.as_str() {
            "push" => {
                if args.len() != 1 {
                    return Err(RuntimeError::MalformedCommand(
                        "push takes exactly one value".to_string(),
                    ));
                }
                Ok(Verb::Push(args.into_iter().next().unwrap_or_default()))
            }
            "pop" => no_args("pop", &args, Verb::Pop),
            "peek" => no_args("peek", &args, Verb::Peek),
            "dup" => no_args("dup", &args, Verb::Dup),
            "drop" => no_args("drop", &args, Verb::Drop),
            "swap" => no_args("swap", &args, Verb::Swap),
            "tuck" => no_args("tuck", &args, Verb::Tuck),
            "over" => no_args("over", &args, Verb::Over),
            "nip" => no_args("nip", &args, Verb::Nip),
            "rot" => no_args("rot", &args, Verb::Rot),
            "dup2" => no_args("dup2", &args, Verb::Dup2),
            "drop2" => no_args("drop2", &args, Verb::Drop2),
            "swap2" => no_args("swap2", &args, Verb::Swap2),
            "over2" => no_args("over2", &args, Verb::Over2),
            "depth" => no_args("depth", &args, Verb::Depth),
            "print" => no_args("print", &args, Verb::Print),
            "flip" => no_args("flip", &args, Verb::Flip),
            "lifo" => no_args("lifo", &args, Verb::Lifo),
            "fifo" => no_args("fifo", &args, Verb::Fifo),
            "add" => no_args("add", &args, Verb::Add),
            "sub" => Ok(Verb::Sub(optional_arg("sub", args)?)),
            "mul" => Ok(Verb::Mul(optional_arg("mul", args)?)),
            "div" => Ok(Verb::Div(optional_arg("div", args)?)),
            "mod" => no_args("mod", &args, Verb::Mod),
            "and" => no_args("and", &args, Verb::And),
            "or" => no_args("or", &args, Verb::Or),
            "xor" => no_args("xor", &args, Verb::Xor),
            "shl" => no_args("shl", &args, Verb::Shl),
            "shr" => no_args("shr", &args, Verb::Shr),
            "pick" => Ok(Verb::Pick(index_arg("pick", &args)?)),
            "roll" => Ok(Verb::Roll(index_arg("roll", &args)?)),
            "store" => Ok(Verb::Store(index_arg("store", &args)?)),
            "load" => Ok(Verb::Load(index_arg("load", &args)?)),
            _ => Err(RuntimeError::UnknownOperation(name)),
        }
    }
}
