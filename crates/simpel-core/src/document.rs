//! Supporting documents attached to an application. Immutable once stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
  /// Kartu Keluarga (family card).
  Kk,
  /// Police report for a lost card.
  SuratPolisi,
  /// Photo or scan of the damaged card.
  KtpRusak,
  /// The card being replaced on a data change.
  Ktp,
}

impl DocumentKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Kk => "KK",
      Self::SuratPolisi => "SURAT_POLISI",
      Self::KtpRusak => "KTP_RUSAK",
      Self::Ktp => "KTP",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "KK" => Ok(Self::Kk),
      "SURAT_POLISI" => Ok(Self::SuratPolisi),
      "KTP_RUSAK" => Ok(Self::KtpRusak),
      "KTP" => Ok(Self::Ktp),
      other => Err(Error::InvalidDocumentKind(other.to_owned())),
    }
  }

  /// Multipart field the file is uploaded under.
  pub fn field_name(self) -> &'static str {
    match self {
      Self::Kk => "kartu_keluarga",
      Self::SuratPolisi => "surat_polisi",
      Self::KtpRusak => "ktp_rusak",
      Self::Ktp => "ktp_lama",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Kk => "Kartu Keluarga",
      Self::SuratPolisi => "Surat Keterangan Polisi",
      Self::KtpRusak => "KTP Rusak",
      Self::Ktp => "KTP Lama",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
  pub document_id:    Uuid,
  pub application_id: Uuid,
  pub kind:           DocumentKind,
  pub file_path:      String,
  pub uploaded_at:    DateTime<Utc>,
}

/// A file already written to disk, awaiting its database row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
  pub kind:      DocumentKind,
  pub file_path: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn column_values() {
    for kind in [
      DocumentKind::Kk,
      DocumentKind::SuratPolisi,
      DocumentKind::KtpRusak,
      DocumentKind::Ktp,
    ] {
      assert_eq!(DocumentKind::parse(kind.as_str()).unwrap(), kind);
    }
    assert!(DocumentKind::parse("AKTA").is_err());
  }
}
