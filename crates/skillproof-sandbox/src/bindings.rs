//! Construction of the global environment skill code runs in.

use std::cell::RefCell;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use mlua::{Function, Lua, LuaSerdeExt, MultiValue, Table, Value, Variadic};
use tracing::trace;

use crate::environment::build_process;
use crate::error::SandboxFault;
use crate::facility::Facility;
use crate::intercept::{FacadeSettings, build_facade};
use crate::loader::build_require;
use crate::profile::SandboxProfile;
use crate::recorder::LedgerHandle;
use crate::scheduler::{Scheduler, delay_from_millis};
use crate::value::{describe, find_fault};

const CONSOLE_TARGET: &str = "skillproof_sandbox::console";

/// Base functions copied from the host globals into the skill environment.
const SAFE_BASE_FUNCTIONS: [&str; 15] = [
    "assert",
    "error",
    "getmetatable",
    "ipairs",
    "next",
    "pairs",
    "rawequal",
    "rawget",
    "rawlen",
    "rawset",
    "select",
    "setmetatable",
    "tonumber",
    "tostring",
    "type",
];

/// Standard libraries shared with skill code as globals and as modules.
const SHARED_LIBRARIES: [&str; 4] = ["string", "table", "math", "utf8"];

const CONSOLE_LEVELS: [&str; 5] = ["log", "info", "warn", "error", "debug"];

/// Everything the environment needs from its execution context.
pub(crate) struct Bindings<'a> {
    pub(crate) ledger: &'a LedgerHandle,
    pub(crate) profile: &'a SandboxProfile,
    pub(crate) scheduler: &'a Rc<RefCell<Scheduler>>,
}

/// Builds the environment table a compiled skill is bound to.
pub(crate) fn build_environment(lua: &Lua, bindings: &Bindings<'_>) -> mlua::Result<Table> {
    let globals = lua.globals();
    let env = lua.create_table()?;

    for name in SAFE_BASE_FUNCTIONS {
        env.set(name, globals.get::<Value>(name)?)?;
    }
    for name in SHARED_LIBRARIES {
        env.set(name, globals.get::<Value>(name)?)?;
    }
    let table_library = globals.get::<Table>("table")?;
    env.set("unpack", table_library.get::<Value>("unpack")?)?;

    install_protected_calls(lua, &env, &globals)?;

    let console = build_console(lua)?;
    env.set("print", console.get::<Value>("log")?)?;
    env.set("console", console)?;

    let json = build_json(lua)?;
    env.set("json", json.clone())?;
    env.set("clock", build_clock(lua)?)?;
    install_timers(lua, &env, bindings.scheduler)?;
    env.set(
        "process",
        build_process(lua, bindings.ledger, bindings.profile.identity())?,
    )?;

    let modules = lua.create_table()?;
    for name in SHARED_LIBRARIES {
        modules.set(name, globals.get::<Value>(name)?)?;
    }
    modules.set("json", json)?;
    modules.set("path", build_path(lua)?)?;

    let settings = FacadeSettings {
        ledger: bindings.ledger.clone(),
        forwarding: bindings.profile.execution_policy().is_forwarding(),
        working_dir: bindings.profile.working_dir().to_path_buf(),
    };
    for facility in Facility::ALL {
        modules.set(facility.module_name(), build_facade(lua, facility, &settings)?)?;
    }
    env.set("require", build_require(lua, modules)?)?;
    env.set("_G", env.clone())?;

    Ok(env)
}

/// Returns `true` when `value` is a caught sandbox fault.
fn is_fault(value: &Value) -> bool {
    matches!(value, Value::Error(error) if find_fault(error).is_some())
}

/// Re-raises a sandbox fault caught by the host `pcall` or `xpcall`.
fn reraise_fault(results: MultiValue) -> mlua::Result<MultiValue> {
    let fault = match (results.front(), results.get(1)) {
        (Some(Value::Boolean(false)), Some(Value::Error(error))) if find_fault(error).is_some() => {
            Some(error.as_ref().clone())
        }
        _ => None,
    };
    fault.map_or(Ok(results), Err)
}

/// Wraps the host `pcall` and `xpcall` so ordinary errors keep their values
/// while sandbox faults propagate.
fn install_protected_calls(lua: &Lua, env: &Table, globals: &Table) -> mlua::Result<()> {
    let host_pcall = globals.get::<Function>("pcall")?;
    env.set(
        "pcall",
        lua.create_function(move |_, args: MultiValue| {
            reraise_fault(host_pcall.call::<MultiValue>(args)?)
        })?,
    )?;

    let host_xpcall = globals.get::<Function>("xpcall")?;
    env.set(
        "xpcall",
        lua.create_function(move |lua, (callable, handler, args): (Value, Value, MultiValue)| {
            let guarded = match handler {
                Value::Function(inner) => Value::Function(lua.create_function(
                    move |_, error: Value| {
                        if is_fault(&error) {
                            return Ok(MultiValue::from_iter([error]));
                        }
                        inner.call::<MultiValue>(error)
                    },
                )?),
                other => other,
            };
            let call: MultiValue = [callable, guarded].into_iter().chain(args).collect();
            reraise_fault(host_xpcall.call::<MultiValue>(call)?)
        })?,
    )?;
    Ok(())
}

fn build_console(lua: &Lua) -> mlua::Result<Table> {
    let console = lua.create_table()?;
    for level in CONSOLE_LEVELS {
        let function = lua.create_function(move |_, args: MultiValue| {
            let line = args.iter().map(describe).collect::<Vec<_>>().join(" ");
            trace!(target: CONSOLE_TARGET, level, "{line}");
            Ok(())
        })?;
        console.set(level, function)?;
    }
    Ok(console)
}

fn build_json(lua: &Lua) -> mlua::Result<Table> {
    let json = lua.create_table()?;
    json.set(
        "encode",
        lua.create_function(|lua, value: Value| {
            let document: serde_json::Value = lua.from_value(value)?;
            serde_json::to_string(&document).map_err(mlua::Error::external)
        })?,
    )?;
    json.set(
        "decode",
        lua.create_function(|lua, text: String| {
            let document: serde_json::Value =
                serde_json::from_str(&text).map_err(mlua::Error::external)?;
            lua.to_value(&document)
        })?,
    )?;
    Ok(json)
}

fn millis_i64(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn build_clock(lua: &Lua) -> mlua::Result<Table> {
    let clock = lua.create_table()?;
    clock.set(
        "now_ms",
        lua.create_function(|_, ()| {
            Ok(SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, millis_i64))
        })?,
    )?;
    let started = Instant::now();
    clock.set(
        "elapsed_ms",
        lua.create_function(move |_, ()| Ok(millis_i64(started.elapsed())))?,
    )?;
    Ok(clock)
}

fn install_timers(lua: &Lua, env: &Table, scheduler: &Rc<RefCell<Scheduler>>) -> mlua::Result<()> {
    let timeouts = Rc::clone(scheduler);
    env.set(
        "set_timeout",
        lua.create_function(move |_, (callback, delay): (Function, Option<f64>)| {
            Ok(timeouts
                .borrow_mut()
                .schedule(callback, delay_from_millis(delay)))
        })?,
    )?;

    let immediates = Rc::clone(scheduler);
    env.set(
        "set_immediate",
        lua.create_function(move |_, callback: Function| {
            Ok(immediates.borrow_mut().schedule(callback, Duration::ZERO))
        })?,
    )?;

    let cancellations = Rc::clone(scheduler);
    let clear = lua.create_function(move |_, id: Option<i64>| {
        if let Some(timer) = id {
            cancellations.borrow_mut().cancel(timer);
        }
        Ok(())
    })?;
    env.set("clear_timeout", clear.clone())?;
    env.set("clear_immediate", clear)?;

    env.set(
        "set_interval",
        lua.create_function(|_, _args: MultiValue| -> mlua::Result<()> {
            Err(SandboxFault::disallowed("set_interval() is not allowed").into_lua())
        })?,
    )?;
    Ok(())
}

fn build_path(lua: &Lua) -> mlua::Result<Table> {
    let path = lua.create_table()?;
    path.set(
        "join",
        lua.create_function(|_, parts: Variadic<String>| {
            let joined: PathBuf = parts.iter().collect();
            Ok(normalize(&joined.to_string_lossy()))
        })?,
    )?;
    path.set(
        "basename",
        lua.create_function(|_, raw: String| {
            Ok(Path::new(&raw)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default())
        })?,
    )?;
    path.set(
        "dirname",
        lua.create_function(|_, raw: String| {
            Ok(Path::new(&raw)
                .parent()
                .map(|parent| parent.to_string_lossy().into_owned())
                .filter(|parent| !parent.is_empty())
                .unwrap_or_else(|| String::from(".")))
        })?,
    )?;
    path.set(
        "extname",
        lua.create_function(|_, raw: String| {
            Ok(Path::new(&raw)
                .extension()
                .map(|extension| format!(".{}", extension.to_string_lossy()))
                .unwrap_or_default())
        })?,
    )?;
    path.set(
        "normalize",
        lua.create_function(|_, raw: String| Ok(normalize(&raw)))?,
    )?;
    path.set(
        "is_absolute",
        lua.create_function(|_, raw: String| Ok(Path::new(&raw).is_absolute()))?,
    )?;
    Ok(path)
}

/// Lexically resolves `.` and `..` components.
fn normalize(raw: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return String::from(".");
    }
    parts
        .iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}
