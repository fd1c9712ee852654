//! Key encoding and entry encryption for the search core.
//!
//! Block cipher plumbing follows the same shape as the AES-256-CBC decryptor
//! used elsewhere in this codebase for at-rest decryption: `aes`+`cbc` with
//! `Pkcs7` padding for variable-length payloads, and a separate no-padding
//! path for the fixed-width id encoding that backs `IndexKey` and `IdHash`.

use aes::cipher::{
    block_padding::{NoPadding, Pkcs7},
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use byteorder::{ByteOrder, LittleEndian};
use errors::SearchError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const KEY_SIZE_BYTES: usize = 32;
pub const IV_SIZE_BYTES: usize = 16;
pub const DIGEST_SIZE_BYTES: usize = 32;

/// The database key shared by the core and the indexer. Opaque to callers
/// beyond its byte length.
#[derive(Clone)]
pub struct DbKey(pub [u8; KEY_SIZE_BYTES]);

/// The IV paired with `DbKey` for every deterministic encoding this crate
/// performs. Shared per mailbox, not regenerated per value - the encodings
/// here are keyed encodings, not general-purpose semantically-secure
/// ciphertexts.
#[derive(Clone)]
pub struct Iv(pub [u8; IV_SIZE_BYTES]);

/// Opaque fixed-width lookup key for a search term.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        base64::encode(&self.0)
    }
}

/// `indexKey(term) = encode_base64(keyed_encrypt(dbKey, iv, term))`.
///
/// `term` is hashed to a fixed 32-byte digest first so the output width does
/// not depend on term length, then that digest is AES-256-CBC encrypted
/// (block-aligned, so no padding is needed). Deterministic: equal terms
/// always produce equal `IndexKey`s.
pub fn index_key(db_key: &DbKey, iv: &Iv, term: &str) -> IndexKey {
    let digest = term_digest(db_key, term);
    let mut buf = digest.to_vec();
    let cipher = Aes256CbcEnc::new(&db_key.0.into(), &iv.0.into());
    let ct_len = cipher
        .encrypt_padded_mut::<NoPadding>(&mut buf, DIGEST_SIZE_BYTES)
        .expect("digest is already block-aligned")
        .len();
    buf.truncate(ct_len);
    IndexKey(buf)
}

fn term_digest(db_key: &DbKey, term: &str) -> [u8; DIGEST_SIZE_BYTES] {
    let mut mac = HmacSha256::new_from_slice(&db_key.0).expect("HMAC accepts any key length");
    mac.update(term.as_bytes());
    mac.finalize().into_bytes().into()
}

/// Entity ids are 16 bytes (a ULID: timestamp prefix + randomness),
/// already exactly one AES block wide.
pub const ID_SIZE_BYTES: usize = 16;

/// Deterministically encrypts an entity id into a fixed-width block so that
/// two postings for the same id produce byte-identical ciphertext, which is
/// what lets `IdHash` (below) pre-filter across terms without decrypting the
/// rest of the entry. A 16-byte id is exactly one AES block, so no padding
/// scheme is needed.
pub fn encrypt_id(db_key: &DbKey, iv: &Iv, id: &[u8; ID_SIZE_BYTES]) -> [u8; ID_SIZE_BYTES] {
    let mut block = *id;
    let cipher = Aes256CbcEnc::new(&db_key.0.into(), &iv.0.into());
    let ct_len = cipher
        .encrypt_padded_mut::<NoPadding>(&mut block, ID_SIZE_BYTES)
        .expect("id block is already block-aligned")
        .len();
    debug_assert_eq!(ct_len, ID_SIZE_BYTES);
    block
}

/// Inverse of [`encrypt_id`].
pub fn decrypt_id(
    db_key: &DbKey,
    iv: &Iv,
    ciphertext: &[u8],
) -> Result<[u8; ID_SIZE_BYTES], SearchError> {
    if ciphertext.len() != ID_SIZE_BYTES {
        return Err(SearchError::Corruption(format!(
            "id ciphertext must be {ID_SIZE_BYTES} bytes, got {}",
            ciphertext.len()
        )));
    }
    let mut buf = [0u8; ID_SIZE_BYTES];
    buf.copy_from_slice(ciphertext);
    let cipher = Aes256CbcDec::new(&db_key.0.into(), &iv.0.into());
    let plain = cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| SearchError::Corruption(format!("id decryption failed: {e}")))?;
    let mut out = [0u8; ID_SIZE_BYTES];
    out.copy_from_slice(plain);
    Ok(out)
}

/// 32-bit hash of an encrypted id's ciphertext, used as the cheap
/// pre-intersection key before paying for full entry decryption. Collisions
/// are tolerated: the exact-id intersection pass re-checks on the decrypted
/// id.
pub fn id_hash(encrypted_id: &[u8]) -> u32 {
    // FNV-1a, 32-bit. Simple, dependency-free, and stable across runs -
    // exactly the properties this pre-filter needs; it is not
    // security-sensitive since Phase B always re-verifies on plaintext.
    const FNV_OFFSET: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for &byte in encrypted_id {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// `ElementDataOS` is keyed by the base64-encoded encrypted id.
pub fn id_to_base64(encrypted_id: &[u8]) -> String {
    base64::encode(encrypted_id)
}

/// Encrypts the `(attribute, positions)` payload of an `Entry`. Uses PKCS7
/// padding since position lists vary in length.
pub fn encrypt_payload(db_key: &DbKey, iv: &Iv, attribute: u8, positions: &[u32]) -> Vec<u8> {
    let mut plain = Vec::with_capacity(1 + 4 + positions.len() * 4);
    plain.push(attribute);
    let mut len_buf = [0u8; 4];
    LittleEndian::write_u32(&mut len_buf, positions.len() as u32);
    plain.extend_from_slice(&len_buf);
    for &p in positions {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, p);
        plain.extend_from_slice(&buf);
    }
    encrypt_bytes(db_key, iv, &plain)
}

/// Inverse of [`encrypt_payload`]. Malformed framing/ciphertext is reported
/// as `SearchError::Corruption`, fatal to this page, not the whole search.
pub fn decrypt_payload(db_key: &DbKey, iv: &Iv, ciphertext: &[u8]) -> Result<(u8, Vec<u32>), SearchError> {
    let plain = decrypt_bytes(db_key, iv, ciphertext)
        .map_err(|_| SearchError::Corruption("entry payload decryption failed".into()))?;

    if plain.len() < 5 {
        return Err(SearchError::Corruption("entry payload too short".into()));
    }
    let attribute = plain[0];
    let count = LittleEndian::read_u32(&plain[1..5]) as usize;
    let rest = &plain[5..];
    if rest.len() != count * 4 {
        return Err(SearchError::Corruption(
            "entry payload position count mismatch".into(),
        ));
    }
    let mut positions = Vec::with_capacity(count);
    for chunk in rest.chunks_exact(4) {
        positions.push(LittleEndian::read_u32(chunk));
    }
    Ok((attribute, positions))
}

/// Generic PKCS7-padded AES-256-CBC encryption, used for the `MetaRow`
/// ciphertext (a variable-length list of chunk descriptors) which has no
/// special framing needs of its own.
pub fn encrypt_bytes(db_key: &DbKey, iv: &Iv, plain: &[u8]) -> Vec<u8> {
    let pad_len = IV_SIZE_BYTES - (plain.len() % IV_SIZE_BYTES);
    let mut buf = plain.to_vec();
    let buf_len = buf.len() + pad_len;
    buf.resize(buf_len, 0);
    let cipher = Aes256CbcEnc::new(&db_key.0.into(), &iv.0.into());
    let ct_len = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buf, buf_len)
        .expect("buffer sized for padding")
        .len();
    buf.truncate(ct_len);
    buf
}

/// Inverse of [`encrypt_bytes`].
pub fn decrypt_bytes(db_key: &DbKey, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, SearchError> {
    if ciphertext.is_empty() || ciphertext.len() % IV_SIZE_BYTES != 0 {
        return Err(SearchError::Corruption(
            "ciphertext is not block-aligned".into(),
        ));
    }
    let mut buf = ciphertext.to_vec();
    let cipher = Aes256CbcDec::new(&db_key.0.into(), &iv.0.into());
    let plain = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| SearchError::Corruption(format!("decryption failed: {e}")))?;
    Ok(plain.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> (DbKey, Iv) {
        (DbKey([7u8; KEY_SIZE_BYTES]), Iv([3u8; IV_SIZE_BYTES]))
    }

    #[test]
    fn index_key_is_deterministic_and_discriminates_terms() {
        let (db_key, iv) = key();
        let a1 = index_key(&db_key, &iv, "alpha");
        let a2 = index_key(&db_key, &iv, "alpha");
        let b = index_key(&db_key, &iv, "beta");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.as_bytes().len(), DIGEST_SIZE_BYTES);
    }

    #[test]
    fn id_round_trips_through_encrypt_decrypt() {
        let (db_key, iv) = key();
        let id = [9u8; ID_SIZE_BYTES];
        let ct = encrypt_id(&db_key, &iv, &id);
        let pt = decrypt_id(&db_key, &iv, &ct).unwrap();
        assert_eq!(pt, id);
    }

    #[test]
    fn same_id_encrypts_to_the_same_ciphertext_every_time() {
        let (db_key, iv) = key();
        let id = [5u8; ID_SIZE_BYTES];
        let ct1 = encrypt_id(&db_key, &iv, &id);
        let ct2 = encrypt_id(&db_key, &iv, &id);
        assert_eq!(ct1, ct2);
        assert_eq!(id_hash(&ct1), id_hash(&ct2));
    }

    #[test]
    fn payload_round_trips() {
        let (db_key, iv) = key();
        let positions = vec![1u32, 5, 9, 42];
        let ct = encrypt_payload(&db_key, &iv, 2, &positions);
        let (attribute, decoded) = decrypt_payload(&db_key, &iv, &ct).unwrap();
        assert_eq!(attribute, 2);
        assert_eq!(decoded, positions);
    }

    #[test]
    fn corrupt_payload_is_reported_as_corruption() {
        let (db_key, iv) = key();
        let err = decrypt_payload(&db_key, &iv, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.tag(), "Corruption");
    }
}
