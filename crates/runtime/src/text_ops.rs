//! Text transforms for text-typed stacks.
//!
//! On a text stack the four numeric verb names take on string meanings:
//! `add` concatenates the two designated elements, `sub:x` strips a
//! trailing run of `x`, `mul:n` repeats, and `div:d` splits on `d` and
//! rejoins with single spaces. Each is a stack-local transform on the top
//! element(s), not a numeric transfer.

use crate::arith::pop_two;
use vantage_core::{RuntimeError, TypedStack, Value};

fn expect_text(stack: &TypedStack, value: Value) -> Result<String, RuntimeError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(RuntimeError::TypeMismatch {
            expected: stack.element_type(),
            found: other.value_type().name().to_string(),
        }),
    }
}

fn push_result(stack: &mut TypedStack, text: String) -> Result<Value, RuntimeError> {
    let value = Value::Text(text);
    stack.push(value.clone())?;
    Ok(value)
}

/// ( a b -- ab ): concatenate the two designated elements.
pub fn concat(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    let a = expect_text(stack, a)?;
    let b = expect_text(stack, b)?;
    push_result(stack, a + &b)
}

/// Strip the trailing run of `ch` from the designated element.
pub fn strip_trailing(stack: &mut TypedStack, ch: char) -> Result<Value, RuntimeError> {
    let top = stack.pop()?;
    let s = expect_text(stack, top)?;
    let stripped = s.trim_end_matches(ch).to_string();
    push_result(stack, stripped)
}

/// Repeat the designated element `n` times.
pub fn repeat(stack: &mut TypedStack, n: usize) -> Result<Value, RuntimeError> {
    let top = stack.pop()?;
    let s = expect_text(stack, top)?;
    push_result(stack, s.repeat(n))
}

/// Split the designated element on `delim` and rejoin the pieces with
/// single spaces.
pub fn split_rejoin(stack: &mut TypedStack, delim: &str) -> Result<Value, RuntimeError> {
    let top = stack.pop()?;
    let s = expect_text(stack, top)?;
    let rejoined = s.split(delim).collect::<Vec<_>>().join(" ");
    push_result(stack, rejoined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::{Perspective, ValueType};

    fn text_stack(items: &[&str]) -> TypedStack {
        let mut s = TypedStack::new("t", ValueType::Text, Perspective::Lifo, 64);
        for item in items {
            s.push(Value::Text((*item).to_string())).unwrap();
        }
        s
    }

    #[test]
    fn concat_joins_in_stack_order() {
        let mut s = text_stack(&["hello", "world"]);
        assert_eq!(concat(&mut s).unwrap(), Value::Text("helloworld".into()));
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn strip_trailing_removes_the_whole_run() {
        let mut s = text_stack(&["banana!!!"]);
        assert_eq!(
            strip_trailing(&mut s, '!').unwrap(),
            Value::Text("banana".into())
        );

        // No trailing run means no change.
        let mut s = text_stack(&["banana"]);
        assert_eq!(
            strip_trailing(&mut s, '!').unwrap(),
            Value::Text("banana".into())
        );
    }

    #[test]
    fn repeat_multiplies_the_string() {
        let mut s = text_stack(&["ab"]);
        assert_eq!(repeat(&mut s, 3).unwrap(), Value::Text("ababab".into()));

        let mut s = text_stack(&["ab"]);
        assert_eq!(repeat(&mut s, 0).unwrap(), Value::Text("".into()));
    }

    #[test]
    fn split_rejoin_replaces_delimiters_with_spaces() {
        let mut s = text_stack(&["a,b,c"]);
        assert_eq!(
            split_rejoin(&mut s, ",").unwrap(),
            Value::Text("a b c".into())
        );
    }

    #[test]
    fn transforms_need_a_top_element() {
        let mut s = text_stack(&[]);
        assert!(matches!(
            strip_trailing(&mut s, 'x'),
            Err(RuntimeError::EmptyStack { .. })
        ));
    }
}
