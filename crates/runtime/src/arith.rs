//! Numeric and bitwise operations.
//!
//! Integer arithmetic uses wrapping semantics throughout for predictable,
//! defined behavior: `i64::MAX + 1` wraps to `i64::MIN`, and
//! `i64::MIN / -1` wraps via `wrapping_div`. Shift amounts are masked
//! modulo 64 by the same doctrine. Float operations follow IEEE 754, so a
//! float division by zero yields an infinity or NaN rather than an error.
//!
//! Integer division or remainder by zero is the one reported failure, and
//! by then both operands have already been popped: the error text says so,
//! because the stack really was mutated.

use vantage_core::{RuntimeError, TypedStack, Value};

/// Pop the two designated operands: `b` from the top, `a` beneath it.
pub(crate) fn pop_two(stack: &mut TypedStack) -> Result<(Value, Value), RuntimeError> {
    if stack.depth() < 2 {
        return Err(RuntimeError::EmptyStack {
            stack: stack.name().to_string(),
            needed: 2,
            depth: stack.depth(),
        });
    }
    let b = stack.pop()?;
    let a = stack.pop()?;
    Ok((a, b))
}

fn operand_mismatch(stack: &TypedStack, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: stack.element_type(),
        found: format!("{} and {}", a.value_type(), b.value_type()),
    }
}

fn push_result(stack: &mut TypedStack, value: Value) -> Result<Value, RuntimeError> {
    stack.push(value.clone())?;
    Ok(value)
}

/// ( a b -- a+b )
pub fn add(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(x.wrapping_add(*y))),
        (Value::Float(x), Value::Float(y)) => push_result(stack, Value::Float(x + y)),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

/// ( a b -- a-b )
pub fn sub(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(x.wrapping_sub(*y))),
        (Value::Float(x), Value::Float(y)) => push_result(stack, Value::Float(x - y)),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

/// ( a b -- a*b )
pub fn mul(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(x.wrapping_mul(*y))),
        (Value::Float(x), Value::Float(y)) => push_result(stack, Value::Float(x * y)),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

/// ( a b -- a/b )
pub fn div(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(0)) => Err(RuntimeError::DivisionByZero {
            op: "div",
            dividend: *x,
        }),
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(x.wrapping_div(*y))),
        (Value::Float(x), Value::Float(y)) => push_result(stack, Value::Float(x / y)),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

/// ( a b -- a%b )
pub fn rem(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(0)) => Err(RuntimeError::DivisionByZero {
            op: "mod",
            dividend: *x,
        }),
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(x.wrapping_rem(*y))),
        (Value::Float(x), Value::Float(y)) => push_result(stack, Value::Float(x % y)),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

fn binary_int(
    stack: &mut TypedStack,
    combine: impl FnOnce(i64, i64) -> i64,
) -> Result<Value, RuntimeError> {
    let (a, b) = pop_two(stack)?;
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => push_result(stack, Value::Int(combine(*x, *y))),
        _ => Err(operand_mismatch(stack, &a, &b)),
    }
}

/// ( a b -- a&b )
pub fn bit_and(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    binary_int(stack, |a, b| a & b)
}

/// ( a b -- a|b )
pub fn bit_or(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    binary_int(stack, |a, b| a | b)
}

/// ( a b -- a^b )
pub fn bit_xor(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    binary_int(stack, |a, b| a ^ b)
}

/// ( a n -- a<<n ), shift amount masked modulo 64.
pub fn shl(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    binary_int(stack, |a, n| a.wrapping_shl(n as u32))
}

/// ( a n -- a>>n ), arithmetic shift, amount masked modulo 64.
pub fn shr(stack: &mut TypedStack) -> Result<Value, RuntimeError> {
    binary_int(stack, |a, n| a.wrapping_shr(n as u32))
}
