//! Restricted Lua execution context with capability interception.
//!
//! The `skillproof-sandbox` crate hosts untrusted skill code in a fresh Lua
//! state per run and funnels every use of a sensitive host facility through a
//! facade that records the attempt in a [`LedgerHandle`]. Callers describe the
//! run with a [`SandboxProfile`], build an [`ExecutionContext`], compile the
//! skill and execute it under a deadline.
//!
//! The context applies a closed-world policy:
//! - Known sensitive facilities (`fs`, `http`, `https`, `net`, `dns`,
//!   `child_process`, `crypto`, `os`, `process.env`) record every call and
//!   return a stub, or forward to a real implementation when the profile
//!   allows execution.
//! - Pass-through facilities (`path`, `json`, `string`, `table`, `math`,
//!   `utf8`) are available without restriction or recording.
//! - Anything else, including path-based `require`, `process.exit()` and
//!   `set_interval`, raises a [`SandboxFault`] that ends the skill without
//!   being recorded.
//!
//! ```
//! use std::time::Duration;
//!
//! use skillproof_permissions::{Capability, Ledger};
//! use skillproof_sandbox::{ExecutionContext, ExecutionOutcome, LedgerHandle, SandboxProfile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = LedgerHandle::new(Ledger::new());
//! let context = ExecutionContext::new(SandboxProfile::new(), ledger.clone())?;
//! let skill = context.compile(
//!     "skill.lua",
//!     r#"local fs = require("fs"); local data = fs.read_file("notes.txt")"#,
//! )?;
//!
//! let outcome = context.execute(&skill, Duration::from_secs(1));
//! assert_eq!(outcome, ExecutionOutcome::Completed);
//! assert!(ledger.mask().contains(Capability::FileRead));
//! # Ok(()) }
//! ```
//!
//! Deadlines are enforced by an instruction-count hook, so busy loops written
//! in Lua are preempted. Host calls that block inside a forwarded operation
//! are not interrupted until they return.

mod bindings;
mod context;
mod environment;
mod error;
pub mod facility;
mod forward;
mod intercept;
mod loader;
mod profile;
mod recorder;
mod scheduler;
mod value;

pub use context::{CompiledSkill, ExecutionContext, ExecutionOutcome};
pub use environment::EnvironmentFacade;
pub use error::{SandboxError, SandboxFault};
pub use facility::{Facility, ModuleResolution, Operation};
pub use profile::{DEFAULT_TIMER_CAP, ExecutionPolicy, SandboxIdentity, SandboxProfile};
pub use recorder::LedgerHandle;

#[cfg(test)]
mod tests;
