//! Catalogue of intercepted host facilities and their operations.
//!
//! Each sensitive facility is exposed to skill code as a module reachable via
//! `require`. Every operation in a facility maps to exactly one capability;
//! calling it records that capability in the run's ledger.

use std::fmt;

use skillproof_permissions::Capability;

/// Module name of the process facade. Environment reads are recorded under
/// this facility.
pub const PROCESS_FACILITY: &str = "process";

/// Modules that load without restriction or recording.
pub const PASS_THROUGH_MODULES: [&str; 6] = ["path", "json", "string", "table", "math", "utf8"];

/// A sensitive host facility exposed through an intercepting facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    /// File system access (`fs`).
    Filesystem,
    /// Plain HTTP client and server (`http`).
    Http,
    /// HTTPS client (`https`).
    Https,
    /// Raw sockets (`net`).
    Net,
    /// Name resolution (`dns`).
    Dns,
    /// Process spawning (`child_process`).
    ChildProcess,
    /// Hashing, ciphers and key material (`crypto`).
    Crypto,
    /// Host introspection (`os`).
    Os,
}

/// One operation within a facility and the capability it exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    name: &'static str,
    capability: Capability,
}

impl Operation {
    const fn new(name: &'static str, capability: Capability) -> Self {
        Self { name, capability }
    }

    /// Returns the operation name as seen by skill code.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the capability the operation records.
    #[must_use]
    pub const fn capability(&self) -> Capability {
        self.capability
    }
}

const FS_OPERATIONS: &[Operation] = &[
    Operation::new("read_file", Capability::FileRead),
    Operation::new("read_dir", Capability::FileRead),
    Operation::new("stat", Capability::FileRead),
    Operation::new("lstat", Capability::FileRead),
    Operation::new("access", Capability::FileRead),
    Operation::new("exists", Capability::FileRead),
    Operation::new("realpath", Capability::FileRead),
    Operation::new("open_read_stream", Capability::FileRead),
    Operation::new("write_file", Capability::FileWrite),
    Operation::new("append_file", Capability::FileWrite),
    Operation::new("mkdir", Capability::FileWrite),
    Operation::new("rmdir", Capability::FileWrite),
    Operation::new("unlink", Capability::FileWrite),
    Operation::new("rename", Capability::FileWrite),
    Operation::new("copy_file", Capability::FileWrite),
    Operation::new("open_write_stream", Capability::FileWrite),
];

const HTTP_OPERATIONS: &[Operation] = &[
    Operation::new("get", Capability::NetworkRead),
    Operation::new("request", Capability::NetworkWrite),
    Operation::new("create_server", Capability::NetworkWrite),
];

const HTTPS_OPERATIONS: &[Operation] = &[
    Operation::new("get", Capability::NetworkRead),
    Operation::new("request", Capability::NetworkWrite),
];

const NET_OPERATIONS: &[Operation] = &[
    Operation::new("create_connection", Capability::NetworkWrite),
    Operation::new("connect", Capability::NetworkWrite),
    Operation::new("create_server", Capability::NetworkWrite),
    Operation::new("socket", Capability::NetworkWrite),
];

const DNS_OPERATIONS: &[Operation] = &[
    Operation::new("lookup", Capability::NetworkRead),
    Operation::new("resolve", Capability::NetworkRead),
    Operation::new("resolve4", Capability::NetworkRead),
    Operation::new("resolve6", Capability::NetworkRead),
    Operation::new("resolve_mx", Capability::NetworkRead),
];

const CHILD_PROCESS_OPERATIONS: &[Operation] = &[
    Operation::new("exec", Capability::ShellExec),
    Operation::new("exec_sync", Capability::ShellExec),
    Operation::new("spawn", Capability::ShellExec),
    Operation::new("spawn_sync", Capability::ShellExec),
    Operation::new("exec_file", Capability::ShellExec),
    Operation::new("exec_file_sync", Capability::ShellExec),
    Operation::new("fork", Capability::ShellExec),
];

const CRYPTO_OPERATIONS: &[Operation] = &[
    Operation::new("create_hash", Capability::CryptoOps),
    Operation::new("create_hmac", Capability::CryptoOps),
    Operation::new("create_cipheriv", Capability::CryptoOps),
    Operation::new("create_decipheriv", Capability::CryptoOps),
    Operation::new("random_bytes", Capability::CryptoOps),
    Operation::new("random_uuid", Capability::CryptoOps),
    Operation::new("generate_key_pair", Capability::CryptoOps),
    Operation::new("create_sign", Capability::CryptoOps),
    Operation::new("create_verify", Capability::CryptoOps),
    Operation::new("pbkdf2", Capability::CryptoOps),
    Operation::new("scrypt", Capability::CryptoOps),
];

const OS_OPERATIONS: &[Operation] = &[
    Operation::new("platform", Capability::SystemInfo),
    Operation::new("arch", Capability::SystemInfo),
    Operation::new("cpus", Capability::SystemInfo),
    Operation::new("total_memory", Capability::SystemInfo),
    Operation::new("free_memory", Capability::SystemInfo),
    Operation::new("home_dir", Capability::SystemInfo),
    Operation::new("tmp_dir", Capability::SystemInfo),
    Operation::new("hostname", Capability::SystemInfo),
    Operation::new("type", Capability::SystemInfo),
    Operation::new("release", Capability::SystemInfo),
    Operation::new("network_interfaces", Capability::SystemInfo),
    Operation::new("user_info", Capability::SystemInfo),
    Operation::new("uptime", Capability::SystemInfo),
    Operation::new("load_average", Capability::SystemInfo),
];

impl Facility {
    /// Every intercepted facility.
    pub const ALL: [Self; 8] = [
        Self::Filesystem,
        Self::Http,
        Self::Https,
        Self::Net,
        Self::Dns,
        Self::ChildProcess,
        Self::Crypto,
        Self::Os,
    ];

    /// Returns the module name skill code passes to `require`.
    #[must_use]
    pub const fn module_name(self) -> &'static str {
        match self {
            Self::Filesystem => "fs",
            Self::Http => "http",
            Self::Https => "https",
            Self::Net => "net",
            Self::Dns => "dns",
            Self::ChildProcess => "child_process",
            Self::Crypto => "crypto",
            Self::Os => "os",
        }
    }

    /// Looks up a facility by module name.
    #[must_use]
    pub fn from_module_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|facility| facility.module_name() == name)
    }

    /// Returns the operations the facade exposes.
    #[must_use]
    pub const fn operations(self) -> &'static [Operation] {
        match self {
            Self::Filesystem => FS_OPERATIONS,
            Self::Http => HTTP_OPERATIONS,
            Self::Https => HTTPS_OPERATIONS,
            Self::Net => NET_OPERATIONS,
            Self::Dns => DNS_OPERATIONS,
            Self::ChildProcess => CHILD_PROCESS_OPERATIONS,
            Self::Crypto => CRYPTO_OPERATIONS,
            Self::Os => OS_OPERATIONS,
        }
    }

    /// Finds an operation by name.
    #[must_use]
    pub fn operation(self, name: &str) -> Option<Operation> {
        self.operations()
            .iter()
            .copied()
            .find(|operation| operation.name == name)
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

/// How a `require` request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolution {
    /// A pass-through module, loaded without recording.
    PassThrough(&'static str),
    /// A sensitive facility, served by its intercepting facade.
    Intercepted(Facility),
    /// A relative or absolute path, which is refused.
    PathBased,
    /// A name outside the catalogue, which is refused.
    Unknown,
}

impl ModuleResolution {
    /// Returns `true` when the request loads a module.
    #[must_use]
    pub const fn is_permitted(self) -> bool {
        matches!(self, Self::PassThrough(_) | Self::Intercepted(_))
    }
}

/// Classifies a module name passed to `require`.
///
/// ```
/// use skillproof_sandbox::facility::{classify_module, ModuleResolution};
/// use skillproof_sandbox::Facility;
///
/// assert_eq!(classify_module("fs"), ModuleResolution::Intercepted(Facility::Filesystem));
/// assert_eq!(classify_module("json"), ModuleResolution::PassThrough("json"));
/// assert_eq!(classify_module("./helpers"), ModuleResolution::PathBased);
/// assert_eq!(classify_module("socket"), ModuleResolution::Unknown);
/// ```
#[must_use]
pub fn classify_module(name: &str) -> ModuleResolution {
    if name.starts_with('.') || name.starts_with('/') {
        return ModuleResolution::PathBased;
    }
    if let Some(module) = PASS_THROUGH_MODULES
        .into_iter()
        .find(|module| *module == name)
    {
        return ModuleResolution::PassThrough(module);
    }
    Facility::from_module_name(name).map_or(ModuleResolution::Unknown, ModuleResolution::Intercepted)
}
