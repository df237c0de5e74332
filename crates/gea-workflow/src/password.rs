//! Salted password digests and opaque session tokens

use crate::{WorkflowError, WorkflowResult};
use rand::RngCore;

const SALT_LEN: usize = 16;

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn digest(salt: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// Hash a password as `salt$hex`
pub fn hash_password(password: &str) -> String {
    let salt = to_hex(&random_bytes::<SALT_LEN>());
    let hash = digest(&salt, password);
    format!("{}${}", salt, hash.to_hex())
}

/// Check a password against a stored `salt$hex` digest
///
/// The digest comparison is constant-time.
pub fn verify_password(password: &str, stored: &str) -> WorkflowResult<bool> {
    let (salt, hex) = stored.split_once('$').ok_or(WorkflowError::MalformedHash)?;
    let expected = blake3::Hash::from_hex(hex).map_err(|_| WorkflowError::MalformedHash)?;
    Ok(digest(salt, password) == expected)
}

/// A fresh opaque bearer token
pub fn generate_token() -> String {
    blake3::hash(&random_bytes::<32>()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored).unwrap());
        assert!(!verify_password("wrong horse", &stored).unwrap());
    }

    #[test]
    fn test_same_password_different_salt() {
        assert_ne!(hash_password("pw"), hash_password("pw"));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(matches!(
            verify_password("pw", "no-separator"),
            Err(WorkflowError::MalformedHash)
        ));
        assert!(verify_password("pw", "salt$zz").is_err());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_token());
    }
}
