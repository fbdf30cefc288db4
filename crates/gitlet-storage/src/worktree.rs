//! Working-tree snapshotting and materialization.
//!
//! `write_tree` turns a directory into tree and blob objects; `checkout`
//! is its inverse, writing a tree's files back onto disk.

use crate::{fsutil, tree, GitObject, ObjectId, ObjectStore, ObjectType, Result, StorageError};
use std::fs;
use std::path::Path;

/// Recursively snapshots a directory as a tree object.
///
/// Regular files become blobs with mode `100644`, directories become
/// sub-trees with mode `40000`. The `.git` directory and anything that
/// is neither a regular file nor a directory (symlinks, sockets) are
/// skipped.
pub fn write_tree(store: &ObjectStore, dir: &Path) -> Result<ObjectId> {
    let mut entries = Vec::new();

    for dentry in fs::read_dir(dir)? {
        let dentry = dentry?;
        let name = dentry.file_name().into_string().map_err(|name| {
            StorageError::InvalidObject(format!("non-unicode file name: {:?}", name))
        })?;
        if name == ".git" {
            continue;
        }

        let file_type = dentry.file_type()?;
        let (mode, id) = if file_type.is_file() {
            (tree::MODE_FILE, store.write_blob_from_path(&dentry.path())?)
        } else if file_type.is_dir() {
            (tree::MODE_DIR, write_tree(store, &dentry.path())?)
        } else {
            continue;
        };

        entries.push(tree::TreeEntry {
            mode: mode.to_string(),
            name,
            id,
        });
    }

    let body = tree::encode(entries);
    store.write(&GitObject::new(ObjectType::Tree, body))
}

/// Recursively materializes a tree into a directory.
///
/// Directory entries (`40000`) are created and recursed into; every other
/// mode is checked out as a regular file holding the blob's exact bytes.
pub fn checkout(store: &ObjectStore, tree_id: &ObjectId, dir: &Path) -> Result<()> {
    let tree = store.read(tree_id)?;

    for entry in tree::parse(&tree.data)? {
        let path = dir.join(&entry.name);
        if entry.is_dir() {
            fsutil::create_dir(&path)?;
            checkout(store, &entry.id, &path)?;
        } else {
            let blob = store.read(&entry.id)?;
            fs::write(&path, &blob.data)?;
        }
    }

    Ok(())
}
