//! The operation engine.
//!
//! Executes one resolved verb against a selected stack. The target's mutex
//! is taken per operation, never across operations, and `bring` never
//! holds two stack locks at once: it pops the source, releases it, then
//! locks the target. That ordering is what makes opposite-direction brings
//! from concurrent spawns deadlock-free.

use crate::arith;
use crate::registry::StackRegistry;
use crate::tasks::TaskRegistry;
use crate::text_ops;
use crate::verbs::Verb;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::warn;
use vantage_core::{CellGrid, RuntimeError, TypedStack, Value, ValueType};

/// Everything an operation may touch besides its target stack. The task
/// registry is held weakly because every spawn worker carries a context;
/// the session stays the sole owner.
#[derive(Clone)]
pub struct ExecContext {
    pub stacks: Arc<StackRegistry>,
    pub memory: Arc<CellGrid>,
    pub tasks: Weak<TaskRegistry>,
}

pub(crate) fn lock_stack(handle: &Mutex<TypedStack>) -> MutexGuard<'_, TypedStack> {
    handle
        .lock()
        .expect("stack mutex poisoned: an operation panicked while holding it")
}

/// Execute one verb against the target stack, returning its status line.
pub fn execute(
    verb: &Verb,
    target: &Mutex<TypedStack>,
    ctx: &ExecContext,
) -> Result<String, RuntimeError> {
    match verb {
        Verb::Push(literal) => {
            let mut s = lock_stack(target);
            let value = Value::parse_as(s.element_type(), literal)?;
            s.push(value.clone())?;
            Ok(format!("{}: pushed {}", s.name(), value))
        }
        Verb::Pop => {
            let mut s = lock_stack(target);
            let value = s.pop()?;
            Ok(format!("{}: popped {}", s.name(), value))
        }
        Verb::Peek => {
            let s = lock_stack(target);
            let value = s.peek()?;
            Ok(format!("{}: top is {}", s.name(), value))
        }
        Verb::Dup => {
            let mut s = lock_stack(target);
            s.dup()?;
            Ok(format!("{}: dup", s.name()))
        }
        Verb::Drop => {
            let mut s = lock_stack(target);
            let value = s.drop_top()?;
            Ok(format!("{}: dropped {}", s.name(), value))
        }
        Verb::Swap => {
            let mut s = lock_stack(target);
            s.swap()?;
            Ok(format!("{}: swap", s.name()))
        }
        Verb::Tuck => {
            let mut s = lock_stack(target);
            s.tuck()?;
            Ok(format!("{}: tuck", s.name()))
        }
        Verb::Over => {
            let mut s = lock_stack(target);
            s.over()?;
            Ok(format!("{}: over", s.name()))
        }
        Verb::Nip => {
            let mut s = lock_stack(target);
            s.nip()?;
            Ok(format!("{}: nip", s.name()))
        }
        Verb::Rot => {
            let mut s = lock_stack(target);
            s.rot()?;
            Ok(format!("{}: rot", s.name()))
        }
        Verb::Pick(n) => {
            let mut s = lock_stack(target);
            s.pick(*n)?;
            Ok(format!("{}: pick {}", s.name(), n))
        }
        Verb::Roll(n) => {
            let mut s = lock_stack(target);
            s.roll(*n)?;
            Ok(format!("{}: roll {}", s.name(), n))
        }
        Verb::Dup2 => {
            let mut s = lock_stack(target);
            s.dup2()?;
            Ok(format!("{}: dup2", s.name()))
        }
        Verb::Drop2 => {
            let mut s = lock_stack(target);
            s.drop2()?;
            Ok(format!("{}: drop2", s.name()))
        }
        Verb::Swap2 => {
            let mut s = lock_stack(target);
            s.swap2()?;
            Ok(format!("{}: swap2", s.name()))
        }
        Verb::Over2 => {
            let mut s = lock_stack(target);
            s.over2()?;
            Ok(format!("{}: over2", s.name()))
        }
        Verb::Depth => {
            let s = lock_stack(target);
            Ok(format!("{}: depth {}", s.name(), s.depth()))
        }
        Verb::Print => Ok(lock_stack(target).render()),
        Verb::Flip => {
            let mut s = lock_stack(target);
            let perspective = s.flip();
            Ok(format!("{}: perspective now {}", s.name(), perspective))
        }
        Verb::Lifo => {
            let mut s = lock_stack(target);
            s.set_perspective(vantage_core::Perspective::Lifo);
            Ok(format!("{}: perspective now lifo", s.name()))
        }
        Verb::Fifo => {
            let mut s = lock_stack(target);
            s.set_perspective(vantage_core::Perspective::Fifo);
            Ok(format!("{}: perspective now fifo", s.name()))
        }
        Verb::Add => {
            let mut s = lock_stack(target);
            let value = match s.element_type() {
                ValueType::Text => text_ops::concat(&mut s)?,
                _ => arith::add(&mut s)?,
            };
            Ok(format!("{}: add = {}", s.name(), value))
        }
        Verb::Sub(arg) => {
            let mut s = lock_stack(target);
            let value = match (s.element_type(), arg) {
                (ValueType::Text, Some(arg)) => {
                    let mut chars = arg.chars();
                    match (chars.next(), chars.next()) {
                        (Some(ch), None) => text_ops::strip_trailing(&mut s, ch)?,
                        _ => {
                            return Err(RuntimeError::MalformedCommand(
                                "sub on a text stack takes a single character".to_string(),
                            ));
                        }
                    }
                }
                (ValueType::Text, None) => {
                    return Err(RuntimeError::MalformedCommand(
                        "sub on a text stack needs a character argument".to_string(),
                    ));
                }
                (_, Some(_)) => {
                    return Err(RuntimeError::MalformedCommand(
                        "sub takes no argument on a numeric stack".to_string(),
                    ));
                }
                (_, None) => arith::sub(&mut s)?,
            };
            Ok(format!("{}: sub = {}", s.name(), value))
        }
        Verb::Mul(arg) => {
            let mut s = lock_stack(target);
            let value = match (s.element_type(), arg) {
                (ValueType::Text, Some(arg)) => {
                    let n = arg.parse::<usize>().map_err(|_| {
                        RuntimeError::MalformedCommand(format!(
                            "mul on a text stack needs a repeat count, got `{}`",
                            arg
                        ))
                    })?;
                    text_ops::repeat(&mut s, n)?
                }
                (ValueType::Text, None) => {
                    return Err(RuntimeError::MalformedCommand(
                        "mul on a text stack needs a repeat count".to_string(),
                    ));
                }
                (_, Some(_)) => {
                    return Err(RuntimeError::MalformedCommand(
                        "mul takes no argument on a numeric stack".to_string(),
                    ));
                }
                (_, None) => arith::mul(&mut s)?,
            };
            Ok(format!("{}: mul = {}", s.name(), value))
        }
        Verb::Div(arg) => {
            let mut s = lock_stack(target);
            let value = match (s.element_type(), arg) {
                (ValueType::Text, Some(delim)) => {
                    if delim.is_empty() {
                        return Err(RuntimeError::MalformedCommand(
                            "div on a text stack needs a non-empty delimiter".to_string(),
                        ));
                    }
                    text_ops::split_rejoin(&mut s, delim)?
                }
                (ValueType::Text, None) => {
                    return Err(RuntimeError::MalformedCommand(
                        "div on a text stack needs a delimiter argument".to_string(),
                    ));
                }
                (_, Some(_)) => {
                    return Err(RuntimeError::MalformedCommand(
                        "div takes no argument on a numeric stack".to_string(),
                    ));
                }
                (_, None) => arith::div(&mut s)?,
            };
            Ok(format!("{}: div = {}", s.name(), value))
        }
        Verb::Mod => {
            let mut s = lock_stack(target);
            if s.element_type() == ValueType::Text {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Int,
                    found: "text".to_string(),
                });
            }
            let value = arith::rem(&mut s)?;
            Ok(format!("{}: mod = {}", s.name(), value))
        }
        Verb::And | Verb::Or | Verb::Xor | Verb::Shl | Verb::Shr => {
            let mut s = lock_stack(target);
            if s.element_type() != ValueType::Int {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Int,
                    found: s.element_type().name().to_string(),
                });
            }
            let (name, value) = match verb {
                Verb::And => ("and", arith::bit_and(&mut s)?),
                Verb::Or => ("or", arith::bit_or(&mut s)?),
                Verb::Xor => ("xor", arith::bit_xor(&mut s)?),
                Verb::Shl => ("shl", arith::shl(&mut s)?),
                _ => ("shr", arith::shr(&mut s)?),
            };
            Ok(format!("{}: {} = {}", s.name(), name, value))
        }
        Verb::Store(addr) => {
            let mut s = lock_stack(target);
            if s.element_type() != ValueType::Int {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Int,
                    found: format!("{} stack", s.element_type()),
                });
            }
            // Bounds first, so a bad address leaves the stack untouched.
            if *addr >= ctx.memory.len() {
                return Err(RuntimeError::IndexOutOfRange {
                    what: "memory address",
                    index: *addr,
                    limit: ctx.memory.len(),
                });
            }
            let value = s.pop()?;
            let Value::Int(n) = value else {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Int,
                    found: value.value_type().name().to_string(),
                });
            };
            ctx.memory.store(*addr, n)?;
            Ok(format!("{}: stored {} at cell {}", s.name(), n, addr))
        }
        Verb::Load(addr) => {
            let mut s = lock_stack(target);
            if s.element_type() != ValueType::Int {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Int,
                    found: format!("{} stack", s.element_type()),
                });
            }
            let n = ctx.memory.load(*addr)?;
            s.push(Value::Int(n))?;
            Ok(format!("{}: loaded {} from cell {}", s.name(), n, addr))
        }
        Verb::Bring { elem, source } => bring(*elem, source, target, ctx),
    }
}

/// Cross-stack transfer: pop one value of `elem` from `source` and push it
/// onto the target. Type and room checks happen before the pop, so a
/// failed bring leaves both stacks unchanged.
fn bring(
    elem: ValueType,
    source: &str,
    target: &Mutex<TypedStack>,
    ctx: &ExecContext,
) -> Result<String, RuntimeError> {
    let src_handle = ctx
        .stacks
        .resolve(source)
        .ok_or_else(|| RuntimeError::UnknownTarget(source.to_string()))?;

    // A self-directed bring degenerates to pop-then-push under one lock;
    // taking the registry handle too would deadlock on the same mutex.
    // Identity is the handle, not the name: a spawn's private workspace may
    // share its name with a registered stack without being that stack.
    if std::ptr::eq(target, Arc::as_ptr(&src_handle)) {
        let mut t = lock_stack(target);
        if t.element_type() != elem {
            return Err(RuntimeError::TypeMismatch {
                expected: t.element_type(),
                found: format!("declared {}", elem),
            });
        }
        let value = t.pop()?;
        t.push(value.clone())?;
        let name = t.name().to_string();
        return Ok(format!("{}: brought {} from {}", name, value, source));
    }

    {
        let t = lock_stack(target);
        if t.element_type() != elem {
            return Err(RuntimeError::TypeMismatch {
                expected: t.element_type(),
                found: format!("declared {}", elem),
            });
        }
        if t.depth() >= t.capacity() {
            return Err(RuntimeError::CapacityExceeded {
                stack: t.name().to_string(),
                capacity: t.capacity(),
            });
        }
    }

    let value = {
        let mut src = lock_stack(&src_handle);
        if src.element_type() != elem {
            return Err(RuntimeError::TypeMismatch {
                expected: elem,
                found: format!("{} stack `{}`", src.element_type(), src.name()),
            });
        }
        src.pop()?
    };

    let mut t = lock_stack(target);
    match t.push(value.clone()) {
        Ok(()) => Ok(format!("{}: brought {} from {}", t.name(), value, source)),
        Err(err) => {
            // A racing writer filled the target between the room check and
            // the push. Put the value back so the transfer stays
            // all-or-nothing.
            drop(t);
            let mut src = lock_stack(&src_handle);
            if src.push(value).is_err() {
                warn!(source, "bring rollback failed; value dropped");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskRegistry;
    use vantage_core::Perspective;

    fn test_ctx() -> (ExecContext, Arc<TaskRegistry>) {
        let tasks = Arc::new(TaskRegistry::new());
        let ctx = ExecContext {
            stacks: Arc::new(StackRegistry::new()),
            memory: Arc::new(CellGrid::new(16)),
            tasks: Arc::downgrade(&tasks),
        };
        (ctx, tasks)
    }

    fn int_target(name: &str) -> Mutex<TypedStack> {
        Mutex::new(TypedStack::new(name, ValueType::Int, Perspective::Lifo, 64))
    }

    #[test]
    fn push_parses_the_target_element_type() {
        let (ctx, _tasks) = test_ctx();
        let target = int_target("s");
        let status = execute(&Verb::Push("5".into()), &target, &ctx).unwrap();
        assert_eq!(status, "s: pushed 5");

        let err = execute(&Verb::Push("abc".into()), &target, &ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
        assert_eq!(lock_stack(&target).depth(), 1);
    }

    #[test]
    fn store_and_load_move_through_the_grid() {
        let (ctx, _tasks) = test_ctx();
        let target = int_target("s");
        execute(&Verb::Push("42".into()), &target, &ctx).unwrap();
        execute(&Verb::Store(3), &target, &ctx).unwrap();
        assert_eq!(lock_stack(&target).depth(), 0);
        assert_eq!(ctx.memory.load(3).unwrap(), 42);

        let status = execute(&Verb::Load(3), &target, &ctx).unwrap();
        assert_eq!(status, "s: loaded 42 from cell 3");
        assert_eq!(lock_stack(&target).depth(), 1);
    }

    #[test]
    fn store_bad_address_leaves_stack_untouched() {
        let (ctx, _tasks) = test_ctx();
        let target = int_target("s");
        execute(&Verb::Push("42".into()), &target, &ctx).unwrap();
        let err = execute(&Verb::Store(999), &target, &ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::IndexOutOfRange { .. }));
        assert_eq!(lock_stack(&target).depth(), 1);
    }

    #[test]
    fn bring_moves_exactly_one_value() {
        let (ctx, _tasks) = test_ctx();
        let (source, _) = ctx
            .stacks
            .create("rstack", ValueType::Int, Perspective::Lifo, 64);
        source.lock().unwrap().push(Value::Int(104)).unwrap();

        let target = int_target("dstack");
        let verb = Verb::Bring {
            elem: ValueType::Int,
            source: "rstack".into(),
        };
        let status = execute(&verb, &target, &ctx).unwrap();
        assert_eq!(status, "dstack: brought 104 from rstack");
        assert_eq!(lock_stack(&target).values(), &[Value::Int(104)]);
        assert_eq!(source.lock().unwrap().depth(), 0);

        // Empty source: reported, both stacks unchanged.
        let err = execute(&verb, &target, &ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::EmptyStack { .. }));
        assert_eq!(lock_stack(&target).depth(), 1);
        assert_eq!(source.lock().unwrap().depth(), 0);
    }

    #[test]
    fn bring_type_checks_before_popping() {
        let (ctx, _tasks) = test_ctx();
        let (source, _) = ctx
            .stacks
            .create("fstack", ValueType::Float, Perspective::Lifo, 64);
        source.lock().unwrap().push(Value::Float(1.5)).unwrap();

        let target = int_target("dstack");
        let verb = Verb::Bring {
            elem: ValueType::Float,
            source: "fstack".into(),
        };
        // Target is an int stack; the declared float type is rejected
        // before anything is popped.
        let err = execute(&verb, &target, &ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
        assert_eq!(source.lock().unwrap().depth(), 1);
        assert_eq!(lock_stack(&target).depth(), 0);
    }

    #[test]
    fn self_bring_uses_one_lock() {
        let (ctx, _tasks) = test_ctx();
        let (handle, _) = ctx
            .stacks
            .create("loop", ValueType::Int, Perspective::Lifo, 64);
        handle.lock().unwrap().push(Value::Int(7)).unwrap();

        let verb = Verb::Bring {
            elem: ValueType::Int,
            source: "loop".into(),
        };
        let status = execute(&verb, &handle, &ctx).unwrap();
        assert_eq!(status, "loop: brought 7 from loop");
        assert_eq!(handle.lock().unwrap().depth(), 1);
    }

    #[test]
    fn bring_resolves_by_handle_not_name() {
        // An unregistered stack (a spawn workspace) may share its name with
        // a registered one; the registered stack is the source.
        let (ctx, _tasks) = test_ctx();
        let (registered, _) = ctx
            .stacks
            .create("worker", ValueType::Int, Perspective::Lifo, 64);
        registered.lock().unwrap().push(Value::Int(5)).unwrap();

        let workspace = int_target("worker");
        let verb = Verb::Bring {
            elem: ValueType::Int,
            source: "worker".into(),
        };
        execute(&verb, &workspace, &ctx).unwrap();
        assert_eq!(lock_stack(&workspace).values(), &[Value::Int(5)]);
        assert_eq!(registered.lock().unwrap().depth(), 0);
    }

    #[test]
    fn unknown_source_is_reported() {
        let (ctx, _tasks) = test_ctx();
        let target = int_target("dstack");
        let verb = Verb::Bring {
            elem: ValueType::Int,
            source: "ghost".into(),
        };
        assert!(matches!(
            execute(&verb, &target, &ctx).unwrap_err(),
            RuntimeError::UnknownTarget(_)
        ));
    }

    #[test]
    fn bitwise_on_float_stack_is_type_mismatch() {
        let (ctx, _tasks) = test_ctx();
        let target = Mutex::new(TypedStack::new(
            "f",
            ValueType::Float,
            Perspective::Lifo,
            64,
        ));
        execute(&Verb::Push("1.5".into()), &target, &ctx).unwrap();
        execute(&Verb::Push("2.5".into()), &target, &ctx).unwrap();
        let err = execute(&Verb::Xor, &target, &ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
        // Operands untouched: the element-type check runs before any pop.
        assert_eq!(lock_stack(&target).depth(), 2);
    }

    #[test]
    fn text_verbs_route_to_text_transforms() {
        let (ctx, _tasks) = test_ctx();
        let target = Mutex::new(TypedStack::new(
            "t",
            ValueType::Text,
            Perspective::Lifo,
            64,
        ));
        execute(&Verb::Push("hello".into()), &target, &ctx).unwrap();
        execute(&Verb::Push("world".into()), &target, &ctx).unwrap();
        let status = execute(&Verb::Add, &target, &ctx).unwrap();
        assert_eq!(status, "t: add = helloworld");

        let status = execute(&Verb::Mul(Some("2".into())), &target, &ctx).unwrap();
        assert_eq!(status, "t: mul = helloworldhelloworld");
    }
}
