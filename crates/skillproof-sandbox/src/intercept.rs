//! Intercepting facades for sensitive facilities.

use std::path::PathBuf;

use mlua::{Lua, MultiValue, Table, Value};
use tracing::debug;

use crate::facility::Facility;
use crate::forward::{self, ForwardFn};
use crate::recorder::LedgerHandle;
use crate::value::describe;

const INTERCEPT_TARGET: &str = "skillproof_sandbox::intercept";

/// Settings shared by every facade in one context.
#[derive(Debug, Clone)]
pub(crate) struct FacadeSettings {
    pub(crate) ledger: LedgerHandle,
    pub(crate) forwarding: bool,
    pub(crate) working_dir: PathBuf,
}

/// Builds the module table skill code receives from `require(<facility>)`.
///
/// Each operation records its capability before anything else happens, then
/// either forwards to the real implementation or returns `nil`.
pub(crate) fn build_facade(lua: &Lua, facility: Facility, settings: &FacadeSettings) -> mlua::Result<Table> {
    let module = lua.create_table()?;
    for operation in facility.operations().iter().copied() {
        let ledger = settings.ledger.clone();
        let working_dir = settings.working_dir.clone();
        let target: Option<ForwardFn> = if settings.forwarding {
            forward::resolve(facility, operation.name())
        } else {
            None
        };
        let function = lua.create_function(move |lua, args: MultiValue| {
            let values: Vec<Value> = args.into_iter().collect();
            let rendered = values.iter().map(describe).collect();
            ledger.record(
                operation.capability(),
                facility.module_name(),
                operation.name(),
                rendered,
            );
            match target {
                Some(real) => {
                    debug!(
                        target: INTERCEPT_TARGET,
                        facility = facility.module_name(),
                        operation = operation.name(),
                        "forwarding intercepted call"
                    );
                    real(lua, &working_dir, values)
                }
                None => Ok(Value::Nil),
            }
        })?;
        module.set(operation.name(), function)?;
    }
    Ok(module)
}
