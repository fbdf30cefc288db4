//! CLI command implementations.

use gitlet_protocol::{
    build_want_request, parse_head_advert, strip_sideband, HttpClient, PackParser,
    ProtocolError,
};
use gitlet_storage::{fsutil, tree, worktree, GitObject, ObjectId, ObjectStore, StorageError};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Identity recorded in commits created by `commit-tree`.
const COMMITTER: &str = "Dev <dev@example.com>";

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Opens the object store of the repository in the current directory.
fn current_store() -> ObjectStore {
    ObjectStore::open(".git")
}

/// Initialize a new repository in the current directory.
pub fn init() -> Result<()> {
    ObjectStore::init(Path::new(".git"))?;
    println!("Initialized git directory");
    Ok(())
}

/// Print an object's body to stdout.
pub fn cat_file(pretty: bool, object: &str) -> Result<()> {
    if !pretty {
        return Err(CliError::Usage(
            "cat-file requires -p (pretty-print)".to_string(),
        ));
    }

    let id = ObjectId::from_hex(object)?;
    let obj = current_store().read(&id)?;

    let mut stdout = std::io::stdout();
    stdout.write_all(&obj.data)?;
    stdout.flush()?;
    Ok(())
}

/// Compute a blob's identifier, optionally writing it to the store.
pub fn hash_object(write: bool, file: &str) -> Result<()> {
    let blob = GitObject::blob(fs::read(file)?);
    if write {
        current_store().write(&blob)?;
    }

    println!("{}", blob.id);
    Ok(())
}

/// List a tree object's entries.
pub fn ls_tree(name_only: bool, tree_id: &str) -> Result<()> {
    let id = ObjectId::from_hex(tree_id)?;
    let obj = current_store().read(&id)?;

    for entry in tree::parse(&obj.data)? {
        if name_only {
            println!("{}", entry.name);
        } else {
            let kind = if entry.is_dir() { "tree" } else { "blob" };
            println!("{} {} {}\t{}", entry.mode, kind, entry.id, entry.name);
        }
    }
    Ok(())
}

/// Snapshot the current directory as a tree object.
pub fn write_tree() -> Result<()> {
    let id = worktree::write_tree(&current_store(), Path::new("."))?;
    println!("{}", id);
    Ok(())
}

/// Create a commit object from a tree and print its identifier.
pub fn commit_tree(tree_id: &str, parents: &[String], message: &str) -> Result<()> {
    let tree_id = ObjectId::from_hex(tree_id)?;
    let parent_ids = parents
        .iter()
        .map(|p| ObjectId::from_hex(p).map_err(CliError::from))
        .collect::<Result<Vec<_>>>()?;

    let signature = commit_signature();
    let commit = GitObject::commit(&tree_id, &parent_ids, &signature, &signature, message);
    current_store().write(&commit)?;

    println!("{}", commit.id);
    Ok(())
}

/// Clone a remote repository into a new directory.
///
/// Pipeline: init the target, discover HEAD, request a pack, strip the
/// side-band framing, decode every object into the store, then check the
/// HEAD commit's tree out into the target directory. A failure at any
/// step aborts the clone; partial state is left on disk.
pub fn clone(url: &str, dir: &str) -> Result<()> {
    let target = Path::new(dir);
    tracing::info!(url = %url, dir = %target.display(), "cloning repository");

    fsutil::create_dir(target)?;
    let store = ObjectStore::init(&target.join(".git"))?;

    let http = HttpClient::new()?;
    let refs = http.get_refs(url)?;
    let head = parse_head_advert(&refs)?;
    tracing::info!(head = %head, "resolved remote HEAD");

    let response = http.post_upload_pack(url, build_want_request(&head))?;
    let pack = strip_sideband(&response)?;
    tracing::debug!(pack_bytes = pack.len(), "stripped side-band framing");

    let ids = PackParser::new(&pack).parse(&store)?;
    tracing::info!(objects = ids.len(), "unpacked objects");

    let commit = store.read(&head)?;
    let tree_id = commit.tree_id()?;
    worktree::checkout(&store, &tree_id, target)?;

    Ok(())
}

/// Formats the fixed committer identity with the current timestamp.
fn commit_signature() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{} {} +0000", COMMITTER, seconds)
}
