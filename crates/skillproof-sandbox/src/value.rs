//! Helpers for rendering Lua values and classifying Lua errors.

use mlua::Value;

use crate::error::SandboxFault;

/// Renders a value for the audit log without exposing addresses.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Nil => String::from("nil"),
        Value::Boolean(flag) => flag.to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.to_string_lossy().to_string(),
        Value::Table(_) => String::from("table"),
        Value::Function(_) => String::from("function"),
        Value::Thread(_) => String::from("thread"),
        Value::UserData(_) | Value::LightUserData(_) => String::from("userdata"),
        _ => String::from("value"),
    }
}

/// Finds a sandbox fault carried by a Lua error, looking through callback
/// and context wrappers.
pub(crate) fn find_fault(error: &mlua::Error) -> Option<&SandboxFault> {
    match error {
        mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
            find_fault(cause)
        }
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<SandboxFault>(),
        _ => None,
    }
}

/// Extracts a readable message from a Lua error.
pub(crate) fn error_message(error: &mlua::Error) -> String {
    match error {
        mlua::Error::RuntimeError(message) | mlua::Error::SyntaxError { message, .. } => {
            message.clone()
        }
        mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
            error_message(cause)
        }
        other => other.to_string(),
    }
}
