//! Metadata reader. Decrypts a term's `Metadata` row and narrows it to the
//! chunk descriptors for one entity kind, newest-first.

use byteorder::{ByteOrder, LittleEndian};
use crypto::{DbKey, IndexKey, Iv};
use store::SearchIndexMetaDataStore;

use crate::{
    error::{Result, SearchError},
    types::{ChunkDescriptor, Metadata, TypeRef},
};

const ROW_SIZE: usize = 8 + 4 + 1 + 1; // key:u64 + size:u32 + app:u8 + type:u8

/// Reads and decrypts a term's metadata, returning only the rows for
/// `type_ref`, ordered by `key` descending, no other ordering or filtering.
/// A store miss is an empty term, not an error.
pub async fn read_meta(
    store: &dyn SearchIndexMetaDataStore,
    db_key: &DbKey,
    iv: &Iv,
    index_key: &IndexKey,
    type_ref: TypeRef,
) -> Result<Vec<ChunkDescriptor>> {
    let Some(ciphertext) = store.get_by_index_key(index_key.as_bytes()).await? else {
        return Ok(Vec::new());
    };
    let metadata = decode_metadata(db_key, iv, &ciphertext)?;
    let mut rows: Vec<ChunkDescriptor> = metadata
        .rows
        .into_iter()
        .filter(|row| row.type_ref == type_ref)
        .collect();
    rows.sort_by(|a, b| b.key.cmp(&a.key));
    Ok(rows)
}

fn decode_metadata(db_key: &DbKey, iv: &Iv, ciphertext: &[u8]) -> Result<Metadata> {
    let plain = crypto::decrypt_bytes(db_key, iv, ciphertext)?;
    if plain.len() < 4 {
        return Err(SearchError::Corruption("metadata row shorter than length prefix".into()));
    }
    let count = LittleEndian::read_u32(&plain[0..4]) as usize;
    let rest = &plain[4..];
    if rest.len() != count * ROW_SIZE {
        return Err(SearchError::Corruption(format!(
            "metadata declared {count} rows but carries {} bytes",
            rest.len()
        )));
    }
    let rows = rest
        .chunks_exact(ROW_SIZE)
        .map(|row| ChunkDescriptor {
            key: LittleEndian::read_u64(&row[0..8]),
            size: LittleEndian::read_u32(&row[8..12]),
            type_ref: TypeRef {
                app: row[12],
                type_id: row[13],
            },
        })
        .collect();
    Ok(Metadata { rows })
}

/// Encodes a `Metadata` row the way the indexer would write it. Used by
/// tests and fixtures to seed a [`store::fake::FakeStore`].
pub fn encode_metadata(db_key: &DbKey, iv: &Iv, metadata: &Metadata) -> Vec<u8> {
    let mut plain = Vec::with_capacity(4 + metadata.rows.len() * ROW_SIZE);
    let mut count_buf = [0u8; 4];
    LittleEndian::write_u32(&mut count_buf, metadata.rows.len() as u32);
    plain.extend_from_slice(&count_buf);
    for row in &metadata.rows {
        let mut buf = [0u8; ROW_SIZE];
        LittleEndian::write_u64(&mut buf[0..8], row.key);
        LittleEndian::write_u32(&mut buf[8..12], row.size);
        buf[12] = row.type_ref.app;
        buf[13] = row.type_ref.type_id;
        plain.extend_from_slice(&buf);
    }
    crypto::encrypt_bytes(db_key, iv, &plain)
}
