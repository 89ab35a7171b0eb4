//! Real implementations reached when a profile allows execution.
//!
//! Only operations with a safe, synchronous host equivalent are forwarded.
//! Everything else keeps returning the stub value even in forwarding mode.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use mlua::{Lua, Value};
use sha2::{Digest, Sha256, Sha512};

use crate::facility::Facility;
use crate::value::describe;

/// Signature of a forwarded operation. The path is the skill directory.
pub(crate) type ForwardFn = fn(&Lua, &Path, Vec<Value>) -> mlua::Result<Value>;

/// Finds the real implementation for a facility operation, if any.
pub(crate) fn resolve(facility: Facility, operation: &str) -> Option<ForwardFn> {
    let forward: ForwardFn = match (facility, operation) {
        (Facility::Filesystem, "read_file") => read_file,
        (Facility::Filesystem, "read_dir") => read_dir,
        (Facility::Filesystem, "stat") => stat,
        (Facility::Filesystem, "lstat") => lstat,
        (Facility::Filesystem, "access") => access,
        (Facility::Filesystem, "exists") => exists,
        (Facility::Filesystem, "realpath") => realpath,
        (Facility::Filesystem, "write_file") => write_file,
        (Facility::Filesystem, "append_file") => append_file,
        (Facility::Filesystem, "mkdir") => mkdir,
        (Facility::Filesystem, "rmdir") => rmdir,
        (Facility::Filesystem, "unlink") => unlink,
        (Facility::Filesystem, "rename") => rename,
        (Facility::Filesystem, "copy_file") => copy_file,
        (Facility::Crypto, "create_hash") => create_hash,
        _ => return None,
    };
    Some(forward)
}

fn string_arg(args: &[Value], position: usize, what: &str) -> mlua::Result<String> {
    match args.get(position) {
        Some(Value::String(text)) => Ok(text.to_string_lossy().to_string()),
        Some(Value::Integer(number)) => Ok(number.to_string()),
        _ => Err(mlua::Error::RuntimeError(format!(
            "argument #{} ({what}) must be a string",
            position + 1
        ))),
    }
}

fn path_arg(base: &Path, args: &[Value], position: usize) -> mlua::Result<PathBuf> {
    let raw = string_arg(args, position, "path")?;
    let candidate = Path::new(&raw);
    if candidate.is_absolute() {
        Ok(candidate.to_path_buf())
    } else {
        Ok(base.join(candidate))
    }
}

fn read_file(lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let bytes = fs::read(path).map_err(mlua::Error::external)?;
    lua.create_string(bytes).map(Value::String)
}

fn read_dir(lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(mlua::Error::external)? {
        let entry = entry.map_err(mlua::Error::external)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    lua.create_sequence_from(names).map(Value::Table)
}

fn metadata_table(lua: &Lua, metadata: &fs::Metadata) -> mlua::Result<Value> {
    let table = lua.create_table()?;
    table.set("size", metadata.len())?;
    table.set("is_file", metadata.is_file())?;
    table.set("is_dir", metadata.is_dir())?;
    table.set("is_symlink", metadata.file_type().is_symlink())?;
    let modified_ms = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    table.set("modified_ms", modified_ms)?;
    Ok(Value::Table(table))
}

fn stat(lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let metadata = fs::metadata(path).map_err(mlua::Error::external)?;
    metadata_table(lua, &metadata)
}

fn lstat(lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let metadata = fs::symlink_metadata(path).map_err(mlua::Error::external)?;
    metadata_table(lua, &metadata)
}

fn access(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    fs::metadata(path).map_err(mlua::Error::external)?;
    Ok(Value::Boolean(true))
}

fn exists(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    Ok(Value::Boolean(path.exists()))
}

fn realpath(lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let resolved = fs::canonicalize(path).map_err(mlua::Error::external)?;
    lua.create_string(resolved.to_string_lossy().as_bytes())
        .map(Value::String)
}

fn data_arg(args: &[Value], position: usize) -> Vec<u8> {
    match args.get(position) {
        Some(Value::String(text)) => text.as_bytes().to_vec(),
        Some(Value::Nil) | None => Vec::new(),
        Some(other) => describe(other).into_bytes(),
    }
}

fn write_file(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let data = data_arg(&args, 1);
    fs::write(path, data).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn append_file(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    let data = data_arg(&args, 1);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(mlua::Error::external)?;
    file.write_all(&data).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn mkdir(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    fs::create_dir_all(path).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn rmdir(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    fs::remove_dir(path).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn unlink(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let path = path_arg(base, &args, 0)?;
    fs::remove_file(path).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn rename(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let from = path_arg(base, &args, 0)?;
    let to = path_arg(base, &args, 1)?;
    fs::rename(from, to).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn copy_file(_lua: &Lua, base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let from = path_arg(base, &args, 0)?;
    let to = path_arg(base, &args, 1)?;
    fs::copy(from, to).map_err(mlua::Error::external)?;
    Ok(Value::Nil)
}

fn create_hash(lua: &Lua, _base: &Path, args: Vec<Value>) -> mlua::Result<Value> {
    let algorithm = string_arg(&args, 0, "algorithm")?;
    let data = data_arg(&args, 1);
    let digest = match algorithm.to_ascii_lowercase().as_str() {
        "sha256" => hex::encode(Sha256::digest(&data)),
        "sha512" => hex::encode(Sha512::digest(&data)),
        other => {
            return Err(mlua::Error::RuntimeError(format!(
                "unsupported hash algorithm '{other}'"
            )));
        }
    };
    lua.create_string(digest).map(Value::String)
}
