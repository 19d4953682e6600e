use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 password text.
///
/// Unsalted and single-round: this gates a share link, it is not a credential store.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Exact, case-sensitive comparison of the input's digest against the stored digest.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    hash_password(password) == password_hash
}
