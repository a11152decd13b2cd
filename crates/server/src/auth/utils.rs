use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::session::SessionId;

const SESSION_ID_LEN: usize = 16;
pub const SESSION_SECRET_LEN: usize = 32;

pub fn hash_token_sha256(secret: &[u8]) -> [u8; 32] {
    let mut hash = Sha256::new();
    hash.update(secret);
    hash.finalize().into()
}

pub fn generate_salt() -> [u8; 16] {
    // uuid is conveniently 128 bits
    Uuid::new_v4().as_u128().to_le_bytes()
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::encode_b64(&generate_salt())?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, encoded_hash: &str) -> bool {
    PasswordHash::new(encoded_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn pack_session_id_and_token(session_id: &SessionId, secret: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(SESSION_ID_LEN + secret.len());
    packed.extend_from_slice(session_id.as_bytes());
    packed.extend_from_slice(secret);
    packed
}

pub fn unpack_session_id_and_token(packed: &[u8]) -> Option<(SessionId, &[u8])> {
    if packed.len() != SESSION_ID_LEN + SESSION_SECRET_LEN {
        return None;
    }
    let (sid, secret) = packed.split_at(SESSION_ID_LEN);
    let sid = Uuid::from_slice(sid).ok()?;
    Some((sid, secret))
}
