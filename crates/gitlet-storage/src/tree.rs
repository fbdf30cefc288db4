//! Tree object body codec.
//!
//! Tree bodies concatenate `<mode> <name>\0<20-byte id>` records with no
//! separator; the only way to find entry boundaries is to locate the NUL
//! and skip exactly twenty bytes.

use crate::{ObjectId, Result, StorageError};

/// Mode string for a regular file entry.
pub const MODE_FILE: &str = "100644";
/// Mode string for a directory entry.
pub const MODE_DIR: &str = "40000";

/// One parsed tree entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// ASCII mode string, e.g. `100644` or `40000`.
    pub mode: String,
    /// Entry name; no embedded NUL or slash.
    pub name: String,
    /// Identifier of the referenced blob or sub-tree.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Returns true for sub-tree entries.
    pub fn is_dir(&self) -> bool {
        self.mode == MODE_DIR
    }
}

/// Parses a tree body into its entries.
pub fn parse(body: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < body.len() {
        let space = body[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| truncated(pos))?;
        let mode = std::str::from_utf8(&body[pos..pos + space])
            .map_err(|_| truncated(pos))?
            .to_string();
        pos += space + 1;

        let nul = body[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| truncated(pos))?;
        let name = std::str::from_utf8(&body[pos..pos + nul])
            .map_err(|_| {
                StorageError::InvalidObject("non-unicode tree entry name".to_string())
            })?
            .to_string();
        pos += nul + 1;

        if pos + ObjectId::LEN > body.len() {
            return Err(truncated(pos));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&body[pos..pos + ObjectId::LEN]);
        pos += ObjectId::LEN;

        entries.push(TreeEntry {
            mode,
            name,
            id: ObjectId::from_bytes(raw),
        });
    }

    Ok(entries)
}

/// Packs entries into a tree body, sorted by raw name bytes.
///
/// Sorted entries make the tree hash deterministic: the same directory
/// always produces the same identifier.
pub fn encode(mut entries: Vec<TreeEntry>) -> Vec<u8> {
    entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    let size: usize = entries
        .iter()
        .map(|e| e.mode.len() + 1 + e.name.len() + 1 + ObjectId::LEN)
        .sum();
    let mut body = Vec::with_capacity(size);

    for entry in &entries {
        body.extend_from_slice(entry.mode.as_bytes());
        body.push(b' ');
        body.extend_from_slice(entry.name.as_bytes());
        body.push(0);
        body.extend_from_slice(entry.id.as_bytes());
    }

    body
}

fn truncated(pos: usize) -> StorageError {
    StorageError::InvalidObject(format!("truncated tree entry at offset {}", pos))
}
