//! Password verification against the Argon2id hashes written by the
//! user repository.

use std::borrow::Cow;

use argon2::{Argon2, PasswordHash, PasswordVerifier};

use crate::error::AuthError;

/// Password bytes as they were fed to the hasher: `pepper || password`.
fn peppered<'a>(password: &'a str, pepper: Option<&str>) -> Cow<'a, [u8]> {
    match pepper {
        Some(p) => Cow::Owned(format!("{p}{password}").into_bytes()),
        None => Cow::Borrowed(password.as_bytes()),
    }
}

/// Verify a plaintext password against a PHC-format hash.
///
/// The Argon2 parameters are read from the hash itself. Returns
/// `Ok(false)` on mismatch and `Err(AuthError::Crypto)` only when the
/// stored hash cannot be parsed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(&peppered(password, pepper), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Algorithm, Params, PasswordHasher, Version};

    use super::*;

    fn hash(password: &str, pepper: Option<&str>) -> String {
        let params = Params::new(19 * 1024, 2, 1, None).unwrap();
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        argon2
            .hash_password(&peppered(password, pepper), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn correct_password_matches() {
        let hash = hash("warehouse-42", None);
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("warehouse-42", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash("warehouse-42", None);
        assert!(!verify_password("warehouse-43", &hash, None).unwrap());
    }

    #[test]
    fn pepper_must_match() {
        let hash = hash("warehouse-42", Some("stock-pepper"));
        assert!(verify_password("warehouse-42", &hash, Some("stock-pepper")).unwrap());
        assert!(!verify_password("warehouse-42", &hash, None).unwrap());
        assert!(!verify_password("warehouse-42", &hash, Some("other")).unwrap());
    }

    #[test]
    fn malformed_hash_is_a_crypto_error() {
        let err = verify_password("pw", "not-a-hash", None).unwrap_err();
        assert!(matches!(err, AuthError::Crypto(_)));
    }
}
