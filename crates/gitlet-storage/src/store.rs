//! On-disk object store and repository layout.

use crate::{fsutil, zlib, GitObject, ObjectId, ObjectType, Result, StorageError};
use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};

/// Content-addressed object store over a sharded `.git/objects` directory.
///
/// Identifiers map to paths as a pure function: the first two hex
/// characters name the shard directory, the remaining thirty-eight name
/// the file. Writes are idempotent; objects are never mutated or deleted.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    /// Opens the store inside an existing `.git` directory.
    pub fn open(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: git_dir.into().join("objects"),
        }
    }

    /// Creates the repository skeleton and returns a store over it.
    ///
    /// Lays out `.git/`, `.git/refs/`, `.git/objects/` (all mode 0755)
    /// and writes the default `HEAD` pointing at `refs/heads/main`.
    pub fn init(git_dir: &Path) -> Result<Self> {
        fsutil::create_dir(git_dir)?;
        fsutil::create_dir(&git_dir.join("refs"))?;
        fsutil::create_dir(&git_dir.join("objects"))?;
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n")?;
        Ok(Self::open(git_dir))
    }

    /// Returns the on-disk path for an identifier.
    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Checks whether an object exists on disk.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Reads an object: resolve path, inflate, parse the framed header.
    pub fn read(&self, id: &ObjectId) -> Result<GitObject> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(id.to_hex()))
            }
            Err(e) => return Err(e.into()),
        };
        let raw = zlib::decompress(&compressed)?;
        parse_framed(&raw)
    }

    /// Writes an object: frame, deflate, store under its identifier.
    ///
    /// Writing an identifier that already exists is a no-op success —
    /// the content is by construction identical.
    pub fn write(&self, object: &GitObject) -> Result<ObjectId> {
        let path = self.object_path(&object.id);
        if path.exists() {
            return Ok(object.id);
        }

        // Single-level create: the objects directory itself must already
        // exist, so a write outside an initialized repository fails loudly.
        let shard = self.objects_dir.join(&object.id.to_hex()[..2]);
        if !shard.exists() {
            fsutil::create_dir(&shard)?;
        }

        let compressed = zlib::compress(&object.framed())?;
        fs::write(&path, compressed)?;
        Ok(object.id)
    }

    /// Reads a file and stores its content as a blob.
    pub fn write_blob_from_path(&self, path: &Path) -> Result<ObjectId> {
        let content = fs::read(path)?;
        self.write(&GitObject::blob(content))
    }
}

/// Splits decompressed object bytes into `<kind> <size>\0<body>`.
///
/// The declared size must be decimal but is not required to match the
/// body length; readers trust a compatible writer.
fn parse_framed(raw: &[u8]) -> Result<GitObject> {
    let null_pos = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StorageError::InvalidObject("missing null byte in header".to_string()))?;

    let header = std::str::from_utf8(&raw[..null_pos])
        .map_err(|_| StorageError::InvalidObject("non-ascii object header".to_string()))?;
    let (type_str, size_str) = header
        .split_once(' ')
        .ok_or_else(|| StorageError::InvalidObject(format!("invalid header: {}", header)))?;

    let object_type = ObjectType::parse(type_str)?;
    size_str
        .parse::<usize>()
        .map_err(|_| StorageError::InvalidObject(format!("invalid size: {}", size_str)))?;

    let body = Bytes::copy_from_slice(&raw[null_pos + 1..]);
    Ok(GitObject::new(object_type, body))
}
