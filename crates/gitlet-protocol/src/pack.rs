//! Git pack file format.
//!
//! A pack is a 12-byte header (`PACK`, version, object count) followed by
//! concatenated object records and a trailing checksum. Each record is a
//! variable-length type+size header, an optional 20-byte base identifier
//! for reference deltas, and a zlib stream holding the body.
//!
//! See: https://git-scm.com/docs/pack-format

use crate::{ProtocolError, Result};
use gitlet_storage::{zlib, GitObject, ObjectId, ObjectStore, ObjectType, StorageError};
use sha1::{Digest, Sha1};

/// Magic bytes at the start of a pack file.
const PACK_SIGNATURE: &[u8; 4] = b"PACK";
/// Pack file version this client handles.
const PACK_VERSION: u32 = 2;

/// Offset-delta type code; recognized but rejected.
const OBJ_OFS_DELTA: u8 = 6;
/// Reference-delta type code.
const OBJ_REF_DELTA: u8 = 7;

/// Parses a pack image and persists every contained object.
pub struct PackParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackParser<'a> {
    /// Creates a parser over a complete pack image.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decodes the pack, writing each object to the store in pack order.
    ///
    /// Writing bases as they arrive is what lets a later ref-delta
    /// resolve its base with a plain store read; the pack is trusted to
    /// emit bases before the deltas that need them. The 20-byte trailer
    /// checksum is not verified.
    pub fn parse(&mut self, store: &ObjectStore) -> Result<Vec<ObjectId>> {
        if self.data.len() < 12 {
            return Err(ProtocolError::InvalidPack("pack too small".to_string()));
        }
        if &self.data[0..4] != PACK_SIGNATURE {
            return Err(ProtocolError::InvalidPack("bad magic".to_string()));
        }

        let version = u32::from_be_bytes([
            self.data[4],
            self.data[5],
            self.data[6],
            self.data[7],
        ]);
        if version != PACK_VERSION {
            return Err(ProtocolError::Unsupported(format!(
                "pack version {}",
                version
            )));
        }

        let object_count = u32::from_be_bytes([
            self.data[8],
            self.data[9],
            self.data[10],
            self.data[11],
        ]) as usize;
        self.pos = 12;

        tracing::debug!(objects = object_count, bytes = self.data.len(), "decoding pack");

        let mut ids = Vec::with_capacity(object_count);
        for index in 0..object_count {
            let id = self.parse_object(store).map_err(|e| match e {
                ProtocolError::InvalidPack(msg) => {
                    ProtocolError::InvalidPack(format!("object {}: {}", index, msg))
                }
                other => other,
            })?;
            ids.push(id);
        }

        Ok(ids)
    }

    /// Parses one object record and writes it to the store.
    fn parse_object(&mut self, store: &ObjectStore) -> Result<ObjectId> {
        let (type_code, size) = self.read_type_and_size()?;

        match type_code {
            1..=4 => {
                let object_type = ObjectType::from_pack_type(type_code)?;
                let body = self.inflate_body(size)?;
                Ok(store.write(&GitObject::new(object_type, body))?)
            }
            OBJ_REF_DELTA => {
                let base_id = self.read_base_id()?;
                let delta = self.inflate_body(size)?;

                let base = store.read(&base_id).map_err(|e| match e {
                    StorageError::ObjectNotFound(hex) => ProtocolError::MissingBase(hex),
                    other => other.into(),
                })?;

                let result = apply_delta(&base.data, &delta)?;
                Ok(store.write(&GitObject::new(base.object_type, result))?)
            }
            OBJ_OFS_DELTA => Err(ProtocolError::Unsupported(
                "offset-delta pack objects".to_string(),
            )),
            other => Err(ProtocolError::Unsupported(format!(
                "pack object type {}",
                other
            ))),
        }
    }

    /// Reads the variable-length type+size header of an object record.
    ///
    /// First byte: bit 7 = continuation, bits 6-4 = type code, bits 3-0 =
    /// low size bits. Continuation bytes contribute seven bits each at
    /// shifts 4, 11, 18, …
    fn read_type_and_size(&mut self) -> Result<(u8, usize)> {
        let mut byte = self.next_byte()?;
        let type_code = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as usize;
        let mut shift = 4;

        while byte & 0x80 != 0 {
            if shift >= usize::BITS as usize {
                return Err(ProtocolError::InvalidPack(
                    "object size varint too long".to_string(),
                ));
            }
            byte = self.next_byte()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
        }

        Ok((type_code, size))
    }

    /// Reads the 20-byte base identifier preceding a ref-delta body.
    fn read_base_id(&mut self) -> Result<ObjectId> {
        if self.pos + 20 > self.data.len() {
            return Err(ProtocolError::InvalidPack(
                "truncated ref-delta base id".to_string(),
            ));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&self.data[self.pos..self.pos + 20]);
        self.pos += 20;
        Ok(ObjectId::from_bytes(raw))
    }

    /// Inflates the zlib stream at the cursor and advances past it.
    fn inflate_body(&mut self, size: usize) -> Result<Vec<u8>> {
        // Declared sizes come off the wire. Zlib inflates at most ~1032:1,
        // so a size past that bound cannot be produced by the remaining
        // bytes and must not drive the allocation.
        const MAX_INFLATE_RATIO: usize = 1032;
        let remaining = self.data.len() - self.pos;
        if size > remaining.saturating_mul(MAX_INFLATE_RATIO) {
            return Err(ProtocolError::InvalidPack(format!(
                "declared size {} exceeds what {} compressed bytes can hold",
                size, remaining
            )));
        }

        let (body, consumed) = zlib::decompress_stream(&self.data[self.pos..], size)
            .map_err(|e| ProtocolError::InvalidPack(format!("decompression failed: {}", e)))?;
        self.pos += consumed;
        Ok(body)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| {
            ProtocolError::InvalidPack("unexpected end of pack".to_string())
        })?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Applies a delta instruction stream to a base body.
///
/// The stream opens with two varints, the source and target sizes, then
/// mixes COPY instructions (bit 7 set: a base range selected by sparse
/// little-endian offset/size bytes, a zero size meaning 0x10000) with
/// INSERT instructions (bit 7 clear: the low seven bits count literal
/// bytes that follow). Command byte zero is reserved and skipped.
fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0;
    let src_size = read_delta_varint(delta, &mut pos)?;
    let tgt_size = read_delta_varint(delta, &mut pos)?;

    if src_size != base.len() {
        return Err(ProtocolError::InvalidPack(format!(
            "delta source size {} does not match base size {}",
            src_size,
            base.len()
        )));
    }

    let mut result = Vec::with_capacity(tgt_size);

    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            // COPY: bits 0-3 select offset bytes, bits 4-6 size bytes.
            let mut offset = 0usize;
            let mut size = 0usize;
            for (bit, shift) in [(0x01u8, 0), (0x02, 8), (0x04, 16), (0x08, 24)] {
                if cmd & bit != 0 {
                    offset |= (next_delta_byte(delta, &mut pos)? as usize) << shift;
                }
            }
            for (bit, shift) in [(0x10u8, 0), (0x20, 8), (0x40, 16)] {
                if cmd & bit != 0 {
                    size |= (next_delta_byte(delta, &mut pos)? as usize) << shift;
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            let end = offset
                .checked_add(size)
                .filter(|&end| end <= base.len())
                .ok_or_else(|| delta_corrupt("copy range outside base"))?;
            if result.len() + size > tgt_size {
                return Err(delta_corrupt("copy overflows target size"));
            }
            result.extend_from_slice(&base[offset..end]);
        } else if cmd > 0 {
            // INSERT: literal bytes from the delta stream.
            let count = cmd as usize;
            if pos + count > delta.len() {
                return Err(delta_corrupt("insert past end of delta"));
            }
            if result.len() + count > tgt_size {
                return Err(delta_corrupt("insert overflows target size"));
            }
            result.extend_from_slice(&delta[pos..pos + count]);
            pos += count;
        }
        // cmd == 0 is reserved — skip.
    }

    Ok(result)
}

/// Reads a little-endian base-128 varint from delta instructions.
fn read_delta_varint(delta: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value = 0usize;
    let mut shift = 0;
    loop {
        if shift >= usize::BITS as usize {
            return Err(delta_corrupt("size varint too long"));
        }
        let byte = next_delta_byte(delta, pos)?;
        value |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(value)
}

fn next_delta_byte(delta: &[u8], pos: &mut usize) -> Result<u8> {
    let byte = *delta
        .get(*pos)
        .ok_or_else(|| delta_corrupt("truncated instruction"))?;
    *pos += 1;
    Ok(byte)
}

fn delta_corrupt(msg: &str) -> ProtocolError {
    ProtocolError::InvalidPack(format!("corrupt delta: {}", msg))
}

/// Builds a pack file from whole (non-delta) objects.
///
/// The counterpart of [`PackParser`] — what a server assembles when
/// answering an upload-pack request.
pub struct PackBuilder {
    objects: Vec<GitObject>,
}

impl PackBuilder {
    /// Creates a new pack builder.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Adds an object to the pack.
    pub fn add(&mut self, object: GitObject) {
        self.objects.push(object);
    }

    /// Builds the pack image: header, object records, SHA-1 trailer.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack.extend_from_slice(&(self.objects.len() as u32).to_be_bytes());

        for object in &self.objects {
            write_object_header(&mut pack, object.object_type.pack_type(), object.size());
            pack.extend_from_slice(&zlib::compress(&object.data)?);
        }

        let mut hasher = Sha1::new();
        hasher.update(&pack);
        let checksum = hasher.finalize();
        pack.extend_from_slice(&checksum);

        Ok(pack)
    }
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the variable-length type+size header for one object record.
fn write_object_header(pack: &mut Vec<u8>, type_code: u8, size: usize) {
    let mut first = (type_code << 4) | ((size & 0x0f) as u8);
    let mut remaining = size >> 4;
    if remaining > 0 {
        first |= 0x80;
    }
    pack.push(first);

    while remaining > 0 {
        let mut byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining > 0 {
            byte |= 0x80;
        }
        pack.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::init(&dir.path().join(".git")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_reject_bad_magic() {
        let (_dir, store) = temp_store();
        let mut parser = PackParser::new(b"JUNK\x00\x00\x00\x02\x00\x00\x00\x00");
        assert!(matches!(
            parser.parse(&store),
            Err(ProtocolError::InvalidPack(_))
        ));
    }

    #[test]
    fn test_reject_bad_version() {
        let (_dir, store) = temp_store();
        let mut data = b"PACK".to_vec();
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        let mut parser = PackParser::new(&data);
        assert!(matches!(
            parser.parse(&store),
            Err(ProtocolError::Unsupported(_))
        ));
    }

    #[test]
    fn test_reject_truncated_header() {
        let (_dir, store) = temp_store();
        assert!(PackParser::new(b"PACK\x00").parse(&store).is_err());
    }

    #[test]
    fn test_single_blob_pack() {
        let (_dir, store) = temp_store();

        let mut builder = PackBuilder::new();
        builder.add(GitObject::blob(b"hi".to_vec()));
        let pack = builder.build().unwrap();

        let ids = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].to_hex(), "32f95c0d1244a78b2be1bab8de17906fabb2c4a8");

        let obj = store.read(&ids[0]).unwrap();
        assert_eq!(obj.object_type, ObjectType::Blob);
        assert_eq!(obj.data.as_ref(), b"hi");
    }

    #[test]
    fn test_pack_roundtrip_multiple_objects() {
        let (_dir, store) = temp_store();

        // A body over 15 bytes exercises the multi-byte size header.
        let big = vec![0x42u8; 5000];
        let mut builder = PackBuilder::new();
        builder.add(GitObject::blob(b"Hello, World!".to_vec()));
        builder.add(GitObject::blob(big.clone()));
        builder.add(GitObject::new(ObjectType::Commit, b"tree \n".to_vec()));
        let pack = builder.build().unwrap();

        let ids = PackParser::new(&pack).parse(&store).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(store.read(&ids[1]).unwrap().data.as_ref(), &big[..]);
        assert_eq!(
            store.read(&ids[2]).unwrap().object_type,
            ObjectType::Commit
        );
    }

    #[test]
    fn test_apply_delta_copy_insert() {
        // COPY(0, 4) + INSERT("CCCC") + COPY(4, 4) over "AAAABBBB".
        let delta = [
            8, 12, // src/tgt sizes
            0x90, 0x04, // copy offset=0 size=4
            0x04, b'C', b'C', b'C', b'C', // insert 4 bytes
            0x91, 0x04, 0x04, // copy offset=4 size=4
        ];
        let result = apply_delta(b"AAAABBBB", &delta).unwrap();
        assert_eq!(result, b"AAAACCCCBBBB");
        assert_eq!(result.len(), 12);
    }

    #[test]
    fn test_apply_delta_source_size_mismatch() {
        let delta = [7, 4, 0x90, 0x04];
        assert!(matches!(
            apply_delta(b"AAAABBBB", &delta),
            Err(ProtocolError::InvalidPack(_))
        ));
    }

    #[test]
    fn test_apply_delta_copy_out_of_range() {
        // COPY offset=6 size=4 reads past the 8-byte base.
        let delta = [8, 4, 0x91, 0x06, 0x04];
        assert!(apply_delta(b"AAAABBBB", &delta).is_err());
    }

    #[test]
    fn test_apply_delta_insert_overflows_target() {
        // Target declared as 2 bytes, insert brings 4.
        let delta = [8, 2, 0x04, b'x', b'x', b'x', b'x'];
        assert!(apply_delta(b"AAAABBBB", &delta).is_err());
    }

    #[test]
    fn test_apply_delta_reserved_command_skipped() {
        let delta = [8, 4, 0x00, 0x90, 0x04];
        assert_eq!(apply_delta(b"AAAABBBB", &delta).unwrap(), b"AAAA");
    }

    #[test]
    fn test_reject_implausible_declared_size() {
        let (_dir, store) = temp_store();

        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        // Blob claiming a gigantic body backed by two compressed bytes.
        write_object_header(&mut pack, 3, usize::MAX >> 8);
        pack.extend_from_slice(&[0x78, 0x9c]);

        assert!(matches!(
            PackParser::new(&pack).parse(&store),
            Err(ProtocolError::InvalidPack(_))
        ));
    }

    #[test]
    fn test_ref_delta_missing_base() {
        let (_dir, store) = temp_store();

        let delta_body = [8u8, 4, 0x90, 0x04];
        let compressed = zlib::compress(&delta_body).unwrap();

        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        write_object_header(&mut pack, OBJ_REF_DELTA, delta_body.len());
        pack.extend_from_slice(&[0xee; 20]);
        pack.extend_from_slice(&compressed);

        assert!(matches!(
            PackParser::new(&pack).parse(&store),
            Err(ProtocolError::MissingBase(_))
        ));
    }

    #[test]
    fn test_offset_delta_rejected() {
        let (_dir, store) = temp_store();

        let mut pack = b"PACK".to_vec();
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        write_object_header(&mut pack, OBJ_OFS_DELTA, 4);

        assert!(matches!(
            PackParser::new(&pack).parse(&store),
            Err(ProtocolError::Unsupported(_))
        ));
    }
}
