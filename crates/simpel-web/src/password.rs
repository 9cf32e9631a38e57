//! Argon2id password hashing.

use std::sync::OnceLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

/// Hash `password` into a PHC string (`$argon2id$v=19$…`).
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// `false` for a wrong password and for an unparseable stored hash.
pub fn verify(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Burn one verification against a fixed hash so that unknown accounts take
/// as long to reject as wrong passwords.
pub fn verify_dummy(password: &str) {
  static DUMMY: OnceLock<Option<String>> = OnceLock::new();
  if let Some(phc) = DUMMY.get_or_init(|| hash("simpel-dummy-password").ok()) {
    let _ = verify(password, phc);
  }
}
