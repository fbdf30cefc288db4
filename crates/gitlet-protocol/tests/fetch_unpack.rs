//! End-to-end flow tests: a synthetic upload-pack response is stripped,
//! decoded into an on-disk store, and checked out into a working tree.

use gitlet_protocol::{
    build_want_request, parse_head_advert, strip_sideband, PackBuilder, PackParser,
};
use gitlet_storage::{tree, worktree, zlib, GitObject, ObjectStore, ObjectType};
use std::fs;
use tempfile::TempDir;

fn pkt(payload: &[u8]) -> Vec<u8> {
    let mut line = format!("{:04x}", payload.len() + 4).into_bytes();
    line.extend_from_slice(payload);
    line
}

/// Builds the repository content used across these tests: one blob, one
/// tree holding it, and a commit pointing at the tree.
fn sample_objects() -> (GitObject, GitObject, GitObject) {
    let blob = GitObject::blob(b"fn main() {}\n".to_vec());
    let tree_body = tree::encode(vec![tree::TreeEntry {
        mode: tree::MODE_FILE.to_string(),
        name: "main.rs".to_string(),
        id: blob.id,
    }]);
    let tree = GitObject::new(ObjectType::Tree, tree_body);
    let author = "Dev <dev@example.com> 1700000000 +0000";
    let commit = GitObject::commit(&tree.id, &[], author, author, "initial");
    (blob, tree, commit)
}

#[test]
fn clone_pipeline_from_sideband_response() {
    let (blob, tree, commit) = sample_objects();
    let head = commit.id;

    // Refs advertisement the way a smart HTTP server frames it.
    let mut refs_resp = pkt(b"# service=git-upload-pack\n");
    refs_resp.extend_from_slice(b"0000");
    refs_resp.extend_from_slice(&pkt(
        format!("{} HEAD\0side-band-64k\n", head).as_bytes(),
    ));
    refs_resp.extend_from_slice(b"0000");

    let advertised = parse_head_advert(&refs_resp).unwrap();
    assert_eq!(advertised, head);

    let want = build_want_request(&advertised);
    assert_eq!(want.len(), 63);

    // Pack the three objects and wrap them in a side-band response.
    let mut builder = PackBuilder::new();
    builder.add(commit.clone());
    builder.add(tree.clone());
    builder.add(blob.clone());
    let pack = builder.build().unwrap();

    let mut upload_resp = pkt(b"NAK\n");
    for chunk in pack.chunks(1000) {
        let mut line = vec![1u8];
        line.extend_from_slice(chunk);
        upload_resp.extend_from_slice(&pkt(&line));
    }
    upload_resp.extend_from_slice(&pkt(b"\x02Enumerating objects: 3, done.\n"));
    upload_resp.extend_from_slice(b"0000");

    let stripped = strip_sideband(&upload_resp).unwrap();
    assert_eq!(stripped, pack);

    // Decode into a fresh repository and materialize the working tree.
    let target = TempDir::new().unwrap();
    let store = ObjectStore::init(&target.path().join(".git")).unwrap();
    let ids = PackParser::new(&stripped).parse(&store).unwrap();
    assert_eq!(ids, vec![commit.id, tree.id, blob.id]);

    let head_commit = store.read(&head).unwrap();
    let tree_id = head_commit.tree_id().unwrap();
    worktree::checkout(&store, &tree_id, target.path()).unwrap();

    assert_eq!(
        fs::read(target.path().join("main.rs")).unwrap(),
        b"fn main() {}\n"
    );
}

#[test]
fn ref_delta_resolves_against_earlier_pack_object() {
    // The delta rebuilds "AAAACCCCBBBB" from "AAAABBBB": copy 4, insert
    // "CCCC", copy 4.
    let base = GitObject::blob(b"AAAABBBB".to_vec());
    let delta = [
        8u8, 12, // source and target sizes
        0x90, 0x04, // copy offset=0 size=4
        0x04, b'C', b'C', b'C', b'C', // insert "CCCC"
        0x91, 0x04, 0x04, // copy offset=4 size=4
    ];

    let mut pack = b"PACK".to_vec();
    pack.extend_from_slice(&2u32.to_be_bytes());
    pack.extend_from_slice(&2u32.to_be_bytes());
    // Base blob record: type 3, 8-byte body.
    pack.push((3 << 4) | 8);
    pack.extend_from_slice(&zlib::compress(&base.data).unwrap());
    // Ref-delta record: type 7, 12-byte delta stream, base id prefix.
    pack.push((7 << 4) | (delta.len() as u8));
    pack.extend_from_slice(base.id.as_bytes());
    pack.extend_from_slice(&zlib::compress(&delta).unwrap());

    let target = TempDir::new().unwrap();
    let store = ObjectStore::init(&target.path().join(".git")).unwrap();
    let ids = PackParser::new(&pack).parse(&store).unwrap();

    assert_eq!(ids.len(), 2);
    let rebuilt = store.read(&ids[1]).unwrap();
    assert_eq!(rebuilt.object_type, ObjectType::Blob);
    assert_eq!(rebuilt.data.as_ref(), b"AAAACCCCBBBB");
}
