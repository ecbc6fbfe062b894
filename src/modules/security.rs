use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

/// Hash a plain password with bcrypt.
///
/// The proxied API stores bcrypt hashes, so the cost and format must stay
/// compatible with what it verifies against.
pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    hash(plain, DEFAULT_COST)
}

/// Verify a password against a stored bcrypt hash.
pub fn verify_password(stored_hash: &str, plain: &str) -> bool {
    verify(plain, stored_hash).unwrap_or(false)
}
