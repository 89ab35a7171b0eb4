//! Execution context: one Lua state, one ledger, one run.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use mlua::{Function, HookTriggers, Lua, LuaOptions, StdLib, Table, VmState};
use serde::Serialize;
use skillproof_permissions::LedgerSnapshot;
use tracing::{debug, warn};

use crate::bindings::{Bindings, build_environment};
use crate::error::{SandboxError, SandboxFault};
use crate::profile::SandboxProfile;
use crate::recorder::LedgerHandle;
use crate::scheduler::Scheduler;
use crate::value::{error_message, find_fault};

const CONTEXT_TARGET: &str = "skillproof_sandbox::context";

/// Number of VM instructions between deadline checks.
const INSTRUCTION_CHECK_INTERVAL: u32 = 1000;

/// How a skill run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The body and every pending timer ran to completion.
    Completed,
    /// A deadline elapsed before the run finished.
    TimedOut {
        /// The deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// The skill raised an error. Recorded attempts before the error stand.
    RuntimeFailure {
        /// The first error raised.
        message: String,
    },
    /// The skill requested something the sandbox refuses outright.
    Disallowed {
        /// Description of the denied request.
        message: String,
    },
}

impl ExecutionOutcome {
    /// Returns `true` when the run completed without error.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A skill compiled against an execution context's environment.
#[derive(Debug, Clone)]
pub struct CompiledSkill {
    name: String,
    function: Function,
}

impl CompiledSkill {
    /// Returns the chunk name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A fresh, isolated Lua state wired to a single ledger.
///
/// A context is created per run and is not shared between runs. Field order
/// matters: the scheduler holds Lua references and must drop before the
/// state does.
pub struct ExecutionContext {
    scheduler: Rc<RefCell<Scheduler>>,
    deadline: Rc<Cell<Option<Instant>>>,
    ledger: LedgerHandle,
    environment: Table,
    lua: Lua,
}

impl ExecutionContext {
    /// Prepares a Lua state with the restricted environment described by
    /// `profile`, recording into `ledger`.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Setup`] when the state or its bindings cannot
    /// be created.
    pub fn new(profile: SandboxProfile, ledger: LedgerHandle) -> Result<Self, SandboxError> {
        let lua = Lua::new_with(
            StdLib::MATH | StdLib::STRING | StdLib::TABLE | StdLib::UTF8,
            LuaOptions::default(),
        )
        .map_err(|error| SandboxError::setup(&error))?;

        let scheduler = Rc::new(RefCell::new(Scheduler::new(profile.timer_cap())));
        let deadline = Rc::new(Cell::new(None));
        install_deadline_hook(&lua, Rc::clone(&deadline));

        let bindings = Bindings {
            ledger: &ledger,
            profile: &profile,
            scheduler: &scheduler,
        };
        let environment =
            build_environment(&lua, &bindings).map_err(|error| SandboxError::setup(&error))?;

        debug!(
            target: CONTEXT_TARGET,
            forwarding = profile.execution_policy().is_forwarding(),
            timer_cap_ms = u64::try_from(profile.timer_cap().as_millis()).unwrap_or(u64::MAX),
            "execution context prepared"
        );

        Ok(Self {
            scheduler,
            deadline,
            ledger,
            environment,
            lua,
        })
    }

    /// Compiles skill source into a function bound to the sandbox
    /// environment. No skill code runs.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::Compile`] when the source does not parse.
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledSkill, SandboxError> {
        let function = self
            .lua
            .load(source)
            .set_name(format!("={name}"))
            .set_environment(self.environment.clone())
            .into_function()
            .map_err(|error| SandboxError::Compile {
                name: name.to_owned(),
                message: error_message(&error),
            })?;
        Ok(CompiledSkill {
            name: name.to_owned(),
            function,
        })
    }

    /// Runs a compiled skill to completion, then drains its pending timers.
    ///
    /// The body runs under `timeout`. If it returns normally and timers are
    /// pending, they are drained in due order under a second deadline of the
    /// same length. A failing timer callback is remembered and draining
    /// continues; a sandbox fault ends the run immediately.
    pub fn execute(&self, skill: &CompiledSkill, timeout: Duration) -> ExecutionOutcome {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        debug!(target: CONTEXT_TARGET, skill = %skill.name, timeout_ms, "skill body started");

        self.arm(timeout);
        let body = skill.function.call::<()>(());
        self.disarm();

        let outcome = match body {
            Ok(()) => self.drain(timeout, timeout_ms),
            Err(error) => classify(&error, timeout_ms),
        };
        self.scheduler.borrow_mut().clear();

        debug!(
            target: CONTEXT_TARGET,
            skill = %skill.name,
            outcome = ?outcome,
            recorded = self.ledger.len(),
            "skill run finished"
        );
        outcome
    }

    /// Returns the ledger this context records into.
    #[must_use]
    pub const fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    /// Copies the ledger state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    fn arm(&self, timeout: Duration) {
        self.deadline.set(Instant::now().checked_add(timeout));
    }

    fn disarm(&self) {
        self.deadline.set(None);
    }

    fn drain(&self, timeout: Duration, timeout_ms: u64) -> ExecutionOutcome {
        let pending = self.scheduler.borrow().pending();
        if pending == 0 {
            return ExecutionOutcome::Completed;
        }
        debug!(target: CONTEXT_TARGET, pending, "draining pending timers");

        self.arm(timeout);
        let limit = self.deadline.get();
        let mut first_failure: Option<String> = None;

        loop {
            let next_due = self.scheduler.borrow().next_due();
            let Some(due) = next_due else {
                break;
            };
            if let Some(limit_at) = limit {
                if due > limit_at {
                    sleep_until(limit_at);
                    self.disarm();
                    return ExecutionOutcome::TimedOut { timeout_ms };
                }
            }
            sleep_until(due);

            let timer = self.scheduler.borrow_mut().pop_next();
            let Some(timer) = timer else {
                break;
            };
            if let Err(error) = timer.into_callback().call::<()>(()) {
                if find_fault(&error).is_some() {
                    self.disarm();
                    return classify(&error, timeout_ms);
                }
                warn!(target: CONTEXT_TARGET, error = %error_message(&error), "timer callback failed");
                first_failure.get_or_insert_with(|| error_message(&error));
            }
        }

        self.disarm();
        first_failure.map_or(ExecutionOutcome::Completed, |message| {
            ExecutionOutcome::RuntimeFailure { message }
        })
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if let Ok(mut scheduler) = self.scheduler.try_borrow_mut() {
            scheduler.clear();
        }
    }
}

fn install_deadline_hook(lua: &Lua, deadline: Rc<Cell<Option<Instant>>>) {
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(INSTRUCTION_CHECK_INTERVAL),
        move |_lua, _debug| match deadline.get() {
            Some(limit) if Instant::now() >= limit => Err(SandboxFault::Timeout.into_lua()),
            _ => Ok(VmState::Continue),
        },
    );
}

fn sleep_until(instant: Instant) {
    let now = Instant::now();
    if instant > now {
        thread::sleep(instant - now);
    }
}

fn classify(error: &mlua::Error, timeout_ms: u64) -> ExecutionOutcome {
    match find_fault(error) {
        Some(SandboxFault::Timeout) => ExecutionOutcome::TimedOut { timeout_ms },
        Some(SandboxFault::Disallowed { message }) => ExecutionOutcome::Disallowed {
            message: message.clone(),
        },
        None => ExecutionOutcome::RuntimeFailure {
            message: error_message(error),
        },
    }
}
