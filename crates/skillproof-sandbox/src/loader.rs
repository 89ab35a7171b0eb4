//! Restricted `require` for skill code.

use mlua::{Function, Lua, Table, Value};
use tracing::{trace, warn};

use crate::error::SandboxFault;
use crate::facility::{ModuleResolution, classify_module};

const LOADER_TARGET: &str = "skillproof_sandbox::loader";

/// Builds the `require` function over a table of preloaded modules.
///
/// Only names in the facility catalogue or the pass-through list resolve.
/// Path-based and unknown names raise a disallowed fault; neither is
/// recorded in the ledger.
pub(crate) fn build_require(lua: &Lua, modules: Table) -> mlua::Result<Function> {
    lua.create_function(move |_, name: String| {
        let resolution = classify_module(&name);
        match resolution {
            ModuleResolution::PassThrough(_) | ModuleResolution::Intercepted(_) => {
                trace!(target: LOADER_TARGET, module = %name, "module loaded");
                modules.get::<Value>(name)
            }
            ModuleResolution::PathBased => {
                warn!(target: LOADER_TARGET, module = %name, "path-based require refused");
                Err(SandboxFault::disallowed(format!("cannot load path-based module '{name}'")).into_lua())
            }
            ModuleResolution::Unknown => {
                warn!(target: LOADER_TARGET, module = %name, "unknown module refused");
                Err(SandboxFault::disallowed(format!("module '{name}' is not available")).into_lua())
            }
        }
    })
}
