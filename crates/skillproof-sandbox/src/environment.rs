//! The `process` facade and its environment proxy.

use mlua::{Lua, MetaMethod, Table, UserData, UserDataMethods, Value};
use skillproof_permissions::Capability;
use tracing::warn;

use crate::error::SandboxFault;
use crate::facility::PROCESS_FACILITY;
use crate::profile::SandboxIdentity;
use crate::recorder::LedgerHandle;
use crate::value::describe;

const ENVIRONMENT_TARGET: &str = "skillproof_sandbox::environment";

/// Environment proxy exposed to skill code as `process.env`.
///
/// Every read records `ENV_ACCESS` and yields nothing, so a skill can never
/// observe a real environment variable. Writes are accepted and discarded.
#[derive(Debug, Clone)]
pub struct EnvironmentFacade {
    ledger: LedgerHandle,
}

impl EnvironmentFacade {
    /// Creates a proxy that records into `ledger`.
    #[must_use]
    pub const fn new(ledger: LedgerHandle) -> Self {
        Self { ledger }
    }

    /// Records a read of `key` and returns no value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.ledger.record(
            Capability::EnvAccess,
            PROCESS_FACILITY,
            &format!("env.{key}"),
            Vec::new(),
        );
        None
    }

    /// Records an existence probe for `key` and reports it absent.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.ledger.record(
            Capability::EnvAccess,
            PROCESS_FACILITY,
            &format!("env.has({key})"),
            Vec::new(),
        );
        false
    }
}

impl UserData for EnvironmentFacade {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |_, this, key: Value| {
            Ok(this.get(&describe(&key)))
        });
        methods.add_meta_method(MetaMethod::NewIndex, |_, _, (_key, _value): (Value, Value)| Ok(()));
    }
}

/// Builds the `process` global.
pub(crate) fn build_process(lua: &Lua, ledger: &LedgerHandle, identity: &SandboxIdentity) -> mlua::Result<Table> {
    let process = lua.create_table()?;
    let facade = EnvironmentFacade::new(ledger.clone());

    process.set("env", lua.create_userdata(facade.clone())?)?;
    process.set(
        "has_env",
        lua.create_function(move |_, key: Value| Ok(facade.has(&describe(&key))))?,
    )?;

    process.set("platform", identity.platform.as_str())?;
    process.set("arch", identity.arch.as_str())?;
    process.set("version", identity.version.as_str())?;
    process.set("pid", identity.pid)?;
    process.set("argv", lua.create_table()?)?;

    let cwd = identity.cwd.clone();
    process.set("cwd", lua.create_function(move |_, ()| Ok(cwd.clone()))?)?;

    let memory_ledger = ledger.clone();
    process.set(
        "memory_usage",
        lua.create_function(move |lua, ()| {
            memory_ledger.record(Capability::SystemInfo, PROCESS_FACILITY, "memory_usage", Vec::new());
            zeroed_table(lua, &["rss", "heap_total", "heap_used", "external"])
        })?,
    )?;

    let cpu_ledger = ledger.clone();
    process.set(
        "cpu_usage",
        lua.create_function(move |lua, ()| {
            cpu_ledger.record(Capability::SystemInfo, PROCESS_FACILITY, "cpu_usage", Vec::new());
            zeroed_table(lua, &["user", "system"])
        })?,
    )?;

    process.set(
        "exit",
        lua.create_function(|_, _code: Option<Value>| -> mlua::Result<()> {
            warn!(target: ENVIRONMENT_TARGET, "skill attempted process.exit()");
            Err(SandboxFault::disallowed("process.exit() is not allowed").into_lua())
        })?,
    )?;

    Ok(process)
}

fn zeroed_table(lua: &Lua, keys: &[&str]) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for key in keys {
        table.set(*key, 0)?;
    }
    Ok(table)
}
