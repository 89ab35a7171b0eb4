//! Domain errors raised by the sandbox.

use thiserror::Error;

/// Errors raised while preparing a context or compiling a skill.
///
/// Both are fatal to an audit run: they occur before any skill code executes.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The Lua state or one of its bindings could not be created.
    #[error("failed to prepare sandbox environment: {message}")]
    Setup {
        /// Description of the underlying Lua failure.
        message: String,
    },

    /// The skill source is not valid Lua.
    #[error("skill '{name}' failed to compile: {message}")]
    Compile {
        /// Chunk name used for the skill.
        name: String,
        /// Parser diagnostic.
        message: String,
    },
}

impl SandboxError {
    pub(crate) fn setup(error: &mlua::Error) -> Self {
        Self::Setup {
            message: error.to_string(),
        }
    }
}

/// Faults raised inside the Lua state that end the skill's execution.
///
/// Faults travel through Lua as external errors. The sandbox `pcall` and
/// `xpcall` re-raise them, so skill code cannot catch a fault and continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxFault {
    /// The active deadline elapsed.
    #[error("skill execution timed out")]
    Timeout,

    /// The skill asked for a facility outside the modelled catalogue, or for
    /// a forbidden control such as `process.exit()`.
    #[error("sandbox denied access: {message}")]
    Disallowed {
        /// Description of the denied request.
        message: String,
    },
}

impl SandboxFault {
    pub(crate) fn disallowed(message: impl Into<String>) -> Self {
        Self::Disallowed {
            message: message.into(),
        }
    }

    pub(crate) fn into_lua(self) -> mlua::Error {
        mlua::Error::external(self)
    }
}
