//! Posting chunk fetcher and entry decryptor.
//!
//! A `PostingChunk` is a sequence of length-prefixed encrypted entries:
//! `u32` little-endian byte length, then that many ciphertext bytes. Framing
//! is deliberately separate from decryption so the intersector's hash pass
//! can hash an entry's id ciphertext without decrypting its payload.

use byteorder::{ByteOrder, LittleEndian};
use crypto::{DbKey, Iv};
use store::SearchIndexStore;

use crate::{
    error::{Result, SearchError},
    types::{ChunkDescriptor, EncryptedEntry, Entry, IdHash},
};

/// One length-framed block inside a raw chunk, before entry decoding.
struct FramedBlock<'a> {
    bytes: &'a [u8],
    index: usize,
}

struct FramingIter<'a> {
    buf: &'a [u8],
    offset: usize,
    index: usize,
}

impl<'a> Iterator for FramingIter<'a> {
    type Item = Result<FramedBlock<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset == self.buf.len() {
            return None;
        }
        if self.offset + 4 > self.buf.len() {
            return Some(Err(SearchError::Corruption(
                "chunk truncated mid length-prefix".into(),
            )));
        }
        let len = LittleEndian::read_u32(&self.buf[self.offset..self.offset + 4]) as usize;
        let start = self.offset + 4;
        let end = start + len;
        if end > self.buf.len() {
            return Some(Err(SearchError::Corruption(
                "chunk truncated mid entry".into(),
            )));
        }
        let block = FramedBlock {
            bytes: &self.buf[start..end],
            index: self.index,
        };
        self.offset = end;
        self.index += 1;
        Some(Ok(block))
    }
}

fn frame_chunk(bytes: &[u8]) -> FramingIter<'_> {
    FramingIter {
        buf: bytes,
        offset: 0,
        index: 0,
    }
}

fn decode_entry(block: &[u8]) -> Result<EncryptedEntry> {
    if block.len() < crypto::ID_SIZE_BYTES {
        return Err(SearchError::Corruption(
            "entry block shorter than id prefix".into(),
        ));
    }
    let mut id_ciphertext = [0u8; crypto::ID_SIZE_BYTES];
    id_ciphertext.copy_from_slice(&block[..crypto::ID_SIZE_BYTES]);
    let payload_ciphertext = block[crypto::ID_SIZE_BYTES..].to_vec();
    Ok(EncryptedEntry {
        id_ciphertext,
        payload_ciphertext,
    })
}

/// Fetches and frames a chunk's entries, without decrypting them. A store
/// miss is an empty chunk, not an error. A chunk that frames fewer or more
/// entries than `desc.size` declares is `Corruption` - fatal to this page,
/// not the whole search.
pub async fn fetch_chunk(
    store: &dyn SearchIndexStore,
    desc: &ChunkDescriptor,
) -> Result<Vec<EncryptedEntry>> {
    let Some(bytes) = store.get_chunk(desc.key).await? else {
        return Ok(Vec::new());
    };
    let mut entries = Vec::with_capacity(desc.size as usize);
    for block in frame_chunk(&bytes) {
        let FramedBlock { bytes, index } = block?;
        let entry = decode_entry(bytes).map_err(|e| {
            SearchError::Corruption(format!("chunk {} entry {index}: {e}", desc.key))
        })?;
        entries.push(entry);
    }
    if entries.len() != desc.size as usize {
        return Err(SearchError::Corruption(format!(
            "chunk {} declared {} entries, framed {}",
            desc.key,
            desc.size,
            entries.len()
        )));
    }
    Ok(entries)
}

/// The intersector's cheap pre-filter key: a hash of the still-encrypted
/// id, no decryption needed.
pub fn id_hash(entry: &EncryptedEntry) -> IdHash {
    crypto::id_hash(&entry.id_ciphertext)
}

/// Decrypts one entry's id and payload.
pub fn decrypt_entry(db_key: &DbKey, iv: &Iv, entry: &EncryptedEntry) -> Result<Entry> {
    let id_bytes = crypto::decrypt_id(db_key, iv, &entry.id_ciphertext)?;
    let id = ulid::Ulid::from_bytes(id_bytes);
    let (attribute, positions) = crypto::decrypt_payload(db_key, iv, &entry.payload_ciphertext)?;
    Ok(Entry {
        id,
        attribute,
        positions,
    })
}

/// Encodes a `PostingChunk` the way the indexer would write it. Used by
/// tests and fixtures to seed a [`store::fake::FakeStore`].
pub fn encode_chunk(
    db_key: &DbKey,
    iv: &Iv,
    entries: &[(crate::types::EntityId, u8, Vec<u32>)],
) -> Vec<u8> {
    let mut out = Vec::new();
    for (id, attribute, positions) in entries {
        let id_ct = crypto::encrypt_id(db_key, iv, &id.to_bytes());
        let payload_ct = crypto::encrypt_payload(db_key, iv, *attribute, positions);
        let mut block = Vec::with_capacity(id_ct.len() + payload_ct.len());
        block.extend_from_slice(&id_ct);
        block.extend_from_slice(&payload_ct);
        let mut len_buf = [0u8; 4];
        LittleEndian::write_u32(&mut len_buf, block.len() as u32);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(&block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;
    use store::fake::FakeStore;
    use ulid::Ulid;

    fn key() -> (DbKey, Iv) {
        (DbKey([4u8; 32]), Iv([6u8; 16]))
    }

    #[tokio::test]
    async fn fetch_and_decrypt_round_trips() {
        let (db_key, iv) = key();
        let id1 = Ulid::from_parts(1_000, 1);
        let id2 = Ulid::from_parts(2_000, 2);
        let bytes = encode_chunk(
            &db_key,
            &iv,
            &[(id1, 0, vec![1, 2]), (id2, 1, vec![9])],
        );
        let store = FakeStore::default();
        store.put_chunk(42, bytes);
        let desc = ChunkDescriptor {
            key: 42,
            size: 2,
            type_ref: TypeRef::MAIL,
        };

        let encrypted = fetch_chunk(&store, &desc).await.unwrap();
        assert_eq!(encrypted.len(), 2);
        let decrypted: Vec<_> = encrypted
            .iter()
            .map(|e| decrypt_entry(&db_key, &iv, e).unwrap())
            .collect();
        assert_eq!(decrypted[0].id, id1);
        assert_eq!(decrypted[0].positions, vec![1, 2]);
        assert_eq!(decrypted[1].id, id2);
        assert_eq!(decrypted[1].attribute, 1);
    }

    #[tokio::test]
    async fn missing_chunk_is_empty_not_an_error() {
        let (db_key, _iv) = key();
        let _ = db_key;
        let store = FakeStore::default();
        let desc = ChunkDescriptor {
            key: 7,
            size: 0,
            type_ref: TypeRef::MAIL,
        };
        let entries = fetch_chunk(&store, &desc).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn size_mismatch_is_corruption() {
        let (db_key, iv) = key();
        let id1 = Ulid::from_parts(1_000, 1);
        let bytes = encode_chunk(&db_key, &iv, &[(id1, 0, vec![1])]);
        let store = FakeStore::default();
        store.put_chunk(1, bytes);
        let desc = ChunkDescriptor {
            key: 1,
            size: 2,
            type_ref: TypeRef::MAIL,
        };
        let err = fetch_chunk(&store, &desc).await.unwrap_err();
        assert_eq!(err.tag(), "Corruption");
    }
}
