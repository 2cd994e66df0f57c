//! Typed stacks with a perspective overlay.
//!
//! A `TypedStack` owns an ordered sequence of values of one fixed element
//! type, a capacity ceiling, and the perspective that decides which end is
//! the top. All shuffle operations (dup, swap, tuck, pick, roll, the
//! paired forms) address storage through the perspective so that flipping
//! never moves an element.
//!
//! Every operation is all-or-nothing: a failed operation leaves contents
//! and length exactly as they were.

use crate::error::RuntimeError;
use crate::perspective::Perspective;
use crate::value::{Value, ValueType};

#[derive(Debug)]
pub struct TypedStack {
    name: String,
    elem: ValueType,
    perspective: Perspective,
    values: Vec<Value>,
    capacity: usize,
}

impl TypedStack {
    pub fn new(
        name: impl Into<String>,
        elem: ValueType,
        perspective: Perspective,
        capacity: usize,
    ) -> Self {
        TypedStack {
            name: name.into(),
            elem,
            perspective,
            values: Vec::new(),
            capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ValueType {
        self.elem
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Contents in storage order (oldest LIFO push first). Mainly for
    /// assertions; commands observe the stack through pop/peek/print.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn set_perspective(&mut self, perspective: Perspective) {
        self.perspective = perspective;
    }

    /// Toggle the perspective, returning the new one. Element order and
    /// count are untouched.
    pub fn flip(&mut self) -> Perspective {
        self.perspective = self.perspective.flip();
        self.perspective
    }

    fn require(&self, needed: usize) -> Result<(), RuntimeError> {
        if self.values.len() < needed {
            return Err(RuntimeError::EmptyStack {
                stack: self.name.clone(),
                needed,
                depth: self.values.len(),
            });
        }
        Ok(())
    }

    fn ensure_room(&self) -> Result<(), RuntimeError> {
        if self.values.len() >= self.capacity {
            return Err(RuntimeError::CapacityExceeded {
                stack: self.name.clone(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Storage index of the element `depth` below the designated top.
    fn at(&self, depth: usize) -> usize {
        self.perspective.slot_from_top(self.values.len(), depth)
    }

    /// Insert at the designated top end without a type check. Used when
    /// the value is already known to belong to this stack.
    fn push_raw(&mut self, value: Value) -> Result<(), RuntimeError> {
        self.ensure_room()?;
        match self.perspective {
            Perspective::Lifo => self.values.push(value),
            Perspective::Fifo => self.values.insert(0, value),
        }
        Ok(())
    }

    /// Push a value, type-checked against the element type.
    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if value.value_type() != self.elem {
            return Err(RuntimeError::TypeMismatch {
                expected: self.elem,
                found: value.value_type().name().to_string(),
            });
        }
        self.push_raw(value)
    }

    /// Remove and return the perspective-designated element.
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.require(1)?;
        let idx = self.at(0);
        Ok(self.values.remove(idx))
    }

    /// The designated element, without removing it.
    pub fn peek(&self) -> Result<&Value, RuntimeError> {
        self.require(1)?;
        Ok(&self.values[self.at(0)])
    }

    /// ( a -- a a )
    pub fn dup(&mut self) -> Result<(), RuntimeError> {
        self.require(1)?;
        self.ensure_room()?;
        let top = self.values[self.at(0)].clone();
        self.push_raw(top)
    }

    /// ( a -- )
    pub fn drop_top(&mut self) -> Result<Value, RuntimeError> {
        self.pop()
    }

    /// ( a b -- b a )
    pub fn swap(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        let (i, j) = (self.at(0), self.at(1));
        self.values.swap(i, j);
        Ok(())
    }

    /// ( a b -- b a b ): reading from the designated top afterwards gives
    /// b, a, b.
    pub fn tuck(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        self.ensure_room()?;
        let top = self.values[self.at(0)].clone();
        let insert_at = match self.perspective {
            Perspective::Lifo => self.values.len() - 2,
            Perspective::Fifo => 2,
        };
        self.values.insert(insert_at, top);
        Ok(())
    }

    /// ( a b -- a b a )
    pub fn over(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        self.ensure_room()?;
        let second = self.values[self.at(1)].clone();
        self.push_raw(second)
    }

    /// ( a b -- b )
    pub fn nip(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        let idx = self.at(1);
        self.values.remove(idx);
        Ok(())
    }

    /// ( a b c -- b c a )
    pub fn rot(&mut self) -> Result<(), RuntimeError> {
        self.require(3)?;
        self.roll(2)
    }

    /// Copy the element at depth n (0 = designated top) to the top.
    pub fn pick(&mut self, n: usize) -> Result<(), RuntimeError> {
        if n >= self.values.len() {
            return Err(RuntimeError::IndexOutOfRange {
                what: "pick depth",
                index: n,
                limit: self.values.len(),
            });
        }
        self.ensure_room()?;
        let picked = self.values[self.at(n)].clone();
        self.push_raw(picked)
    }

    /// Remove the element at depth n and push it to the top.
    pub fn roll(&mut self, n: usize) -> Result<(), RuntimeError> {
        if n >= self.values.len() {
            return Err(RuntimeError::IndexOutOfRange {
                what: "roll depth",
                index: n,
                limit: self.values.len(),
            });
        }
        if n == 0 {
            return Ok(());
        }
        let idx = self.at(n);
        let rolled = self.values.remove(idx);
        self.push_raw(rolled)
    }

    /// ( a b -- a b a b )
    pub fn dup2(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        if self.values.len() + 2 > self.capacity {
            return Err(RuntimeError::CapacityExceeded {
                stack: self.name.clone(),
                capacity: self.capacity,
            });
        }
        let second = self.values[self.at(1)].clone();
        let top = self.values[self.at(0)].clone();
        self.push_raw(second)?;
        self.push_raw(top)
    }

    /// ( a b -- )
    pub fn drop2(&mut self) -> Result<(), RuntimeError> {
        self.require(2)?;
        self.pop()?;
        self.pop()?;
        Ok(())
    }

    /// ( a b c d -- c d a b ): the top two-element unit trades places with
    /// the unit below it.
    pub fn swap2(&mut self) -> Result<(), RuntimeError> {
        self.require(4)?;
        let (i0, i2) = (self.at(0), self.at(2));
        self.values.swap(i0, i2);
        let (i1, i3) = (self.at(1), self.at(3));
        self.values.swap(i1, i3);
        Ok(())
    }

    /// ( a b c d -- a b c d a b ): copy the second unit over the top one.
    pub fn over2(&mut self) -> Result<(), RuntimeError> {
        self.require(4)?;
        if self.values.len() + 2 > self.capacity {
            return Err(RuntimeError::CapacityExceeded {
                stack: self.name.clone(),
                capacity: self.capacity,
            });
        }
        let lower = self.values[self.at(3)].clone();
        let upper = self.values[self.at(2)].clone();
        self.push_raw(lower)?;
        self.push_raw(upper)
    }

    /// Render contents in storage order with the designated element in
    /// brackets: `lifo mode: 1 2 3 [4]`, `fifo mode: [1] 2 3 4`.
    pub fn render(&self) -> String {
        if self.values.is_empty() {
            return format!("{} mode: (empty)", self.perspective);
        }
        let designated = self.at(0);
        let parts: Vec<String> = self
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == designated {
                    format!("[{}]", v)
                } else {
                    v.to_string()
                }
            })
            .collect();
        format!("{} mode: {}", self.perspective, parts.join(" "))
    }
}
