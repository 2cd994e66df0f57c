//! Global memory: a fixed-size grid of integer cells.
//!
//! One grid is shared by every stack's store/load operations, from the
//! interactive dispatcher and from every spawn thread. Access is
//! serialized behind a single mutex; each store or load is one short
//! critical section. The cell count is fixed at construction and the grid
//! lives for the process.

use crate::error::RuntimeError;
use std::sync::Mutex;

#[derive(Debug)]
pub struct CellGrid {
    cells: Mutex<Box<[i64]>>,
    len: usize,
}

impl CellGrid {
    pub fn new(len: usize) -> Self {
        CellGrid {
            cells: Mutex::new(vec![0i64; len].into_boxed_slice()),
            len,
        }
    }

    /// Number of addressable cells.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, addr: usize) -> Result<(), RuntimeError> {
        if addr >= self.len {
            return Err(RuntimeError::IndexOutOfRange {
                what: "memory address",
                index: addr,
                limit: self.len,
            });
        }
        Ok(())
    }

    /// Write a value to a cell. Out-of-range addresses are a reported
    /// error, never undefined behavior.
    pub fn store(&self, addr: usize, value: i64) -> Result<(), RuntimeError> {
        self.check(addr)?;
        let mut cells = self
            .cells
            .lock()
            .expect("cell grid mutex poisoned: a writer panicked mid-store");
        cells[addr] = value;
        Ok(())
    }

    /// Read a cell.
    pub fn load(&self, addr: usize) -> Result<i64, RuntimeError> {
        self.check(addr)?;
        let cells = self
            .cells
            .lock()
            .expect("cell grid mutex poisoned: a writer panicked mid-store");
        Ok(cells[addr])
    }
}
