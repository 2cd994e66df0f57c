//! Environment-variable tunables.
//!
//! Two knobs, both optional:
//!
//! - `VANTAGE_MEMORY_CELLS`: cell count of the global memory grid
//! - `VANTAGE_STACK_CAPACITY`: default capacity ceiling for new stacks
//!   (and spawn workspaces)
//!
//! Invalid or zero values print a warning to stderr and fall back to the
//! default. Parsing is a pure function over `Option<String>` so tests can
//! exercise it without touching the process environment.

use std::env;

pub const DEFAULT_MEMORY_CELLS: usize = 1024;
pub const DEFAULT_STACK_CAPACITY: usize = 1024;

pub const MEMORY_CELLS_VAR: &str = "VANTAGE_MEMORY_CELLS";
pub const STACK_CAPACITY_VAR: &str = "VANTAGE_STACK_CAPACITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub memory_cells: usize,
    pub stack_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            memory_cells: DEFAULT_MEMORY_CELLS,
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Read the tunables from the environment.
    pub fn from_env() -> Self {
        SessionConfig {
            memory_cells: parse_setting(
                MEMORY_CELLS_VAR,
                DEFAULT_MEMORY_CELLS,
                env::var(MEMORY_CELLS_VAR).ok(),
            ),
            stack_capacity: parse_setting(
                STACK_CAPACITY_VAR,
                DEFAULT_STACK_CAPACITY,
                env::var(STACK_CAPACITY_VAR).ok(),
            ),
        }
    }
}

/// Parse a setting from an optional string value. Returns the parsed
/// value, or `default` if the value is missing, zero, or invalid. Prints a
/// warning to stderr for invalid values.
fn parse_setting(name: &str, default: usize, value: Option<String>) -> usize {
    match value {
        Some(val) => match val.parse::<usize>() {
            Ok(0) => {
                eprintln!("Warning: {}=0 is invalid, using default {}", name, default);
                default
            }
            Ok(n) => n,
            Err(_) => {
                eprintln!(
                    "Warning: {}='{}' is not a valid number, using default {}",
                    name, val, default
                );
                default
            }
        },
        None => default,
    }
}
