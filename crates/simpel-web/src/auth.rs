//! Credential checks for citizens and officers.
//!
//! Every path through these functions performs exactly one Argon2
//! verification, so response time does not reveal whether an account exists
//! or has a password.

use simpel_core::{
  citizen::{Citizen, Nik},
  officer::Officer,
  store::PortalStore,
};

use crate::password;

#[derive(Debug)]
pub enum Outcome<T> {
  Accepted(T),
  InvalidCredentials,
  /// The citizen exists but was registered without a password.
  NoPasswordSet,
}

pub async fn citizen<S: PortalStore>(
  store: &S,
  nik: &Nik,
  password: &str,
) -> Result<Outcome<Citizen>, S::Error> {
  let Some(citizen) = store.get_citizen(nik).await? else {
    password::verify_dummy(password);
    return Ok(Outcome::InvalidCredentials);
  };
  let Some(phc) = citizen.password_hash.as_deref().filter(|h| !h.is_empty()) else {
    password::verify_dummy(password);
    return Ok(Outcome::NoPasswordSet);
  };
  if password::verify(password, phc) {
    Ok(Outcome::Accepted(citizen))
  } else {
    Ok(Outcome::InvalidCredentials)
  }
}

pub async fn officer<S: PortalStore>(
  store: &S,
  nip: &str,
  password: &str,
) -> Result<Outcome<Officer>, S::Error> {
  let Some(officer) = store.officer_by_nip(nip).await? else {
    password::verify_dummy(password);
    return Ok(Outcome::InvalidCredentials);
  };
  if password::verify(password, &officer.password_hash) {
    Ok(Outcome::Accepted(officer))
  } else {
    Ok(Outcome::InvalidCredentials)
  }
}
