//! Supporting-document uploads: content sniffing and storage on disk.

use std::{
  io,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use simpel_core::{citizen::Nik, document::DocumentKind};
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

/// Per-file ceiling, independent of the request body limit.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
  Pdf,
  Jpeg,
  Png,
}

impl FileType {
  /// Identify a file from its leading magic bytes.
  pub fn sniff(bytes: &[u8]) -> Option<Self> {
    if bytes.starts_with(b"%PDF-") {
      Some(Self::Pdf)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
      Some(Self::Jpeg)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
      Some(Self::Png)
    } else {
      None
    }
  }

  pub fn accepts_extension(self, ext: &str) -> bool {
    match self {
      Self::Pdf => ext == "pdf",
      Self::Jpeg => ext == "jpg" || ext == "jpeg",
      Self::Png => ext == "png",
    }
  }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub file_name: String,
  pub bytes:     Bytes,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
  #[error("Ukuran file melebihi batas 10MB")]
  TooLarge,
  #[error("Format file tidak didukung. Gunakan PDF, JPG, atau PNG")]
  Unsupported,
  #[error("Ekstensi file tidak sesuai dengan konten")]
  ExtensionMismatch,
}

/// Lower-cased extension of `file_name`, without the dot.
fn extension(file_name: &str) -> Option<String> {
  Path::new(file_name)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
}

impl UploadedFile {
  /// Check size, sniffed type, and extension. Returns the extension the
  /// file will be stored under.
  pub fn validate(&self) -> Result<String, UploadError> {
    if self.bytes.len() > MAX_FILE_SIZE {
      return Err(UploadError::TooLarge);
    }
    let kind = FileType::sniff(&self.bytes).ok_or(UploadError::Unsupported)?;
    match extension(&self.file_name) {
      Some(ext) if kind.accepts_extension(&ext) => Ok(ext),
      _ => Err(UploadError::ExtensionMismatch),
    }
  }
}

/// Write `file` to `<upload_dir>/<nik>/<KIND>_<nik>_<millis>.<ext>`. A name
/// already taken in the same millisecond gets a `_<n>` suffix; existing
/// files are never overwritten.
pub async fn save(
  upload_dir: &Path,
  nik: &Nik,
  kind: DocumentKind,
  file: &UploadedFile,
  ext: &str,
  now: DateTime<Utc>,
) -> io::Result<PathBuf> {
  let dir = upload_dir.join(nik.as_str());
  tokio::fs::create_dir_all(&dir).await?;
  let stem = format!("{}_{}_{}", kind.as_str(), nik, now.timestamp_millis());

  let mut n = 0u32;
  loop {
    let path = match n {
      0 => dir.join(format!("{stem}.{ext}")),
      n => dir.join(format!("{stem}_{n}.{ext}")),
    };
    match OpenOptions::new().write(true).create_new(true).open(&path).await {
      Ok(mut out) => {
        out.write_all(&file.bytes).await?;
        out.flush().await?;
        return Ok(path);
      }
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
      Err(e) => return Err(e),
    }
  }
}

/// Best-effort removal of files written for a submission that failed.
pub async fn cleanup(paths: &[PathBuf]) {
  for path in paths {
    if let Err(e) = tokio::fs::remove_file(path).await {
      tracing::warn!(?path, error = %e, "could not remove orphaned upload");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn file(name: &str, bytes: &'static [u8]) -> UploadedFile {
    UploadedFile { file_name: name.to_owned(), bytes: Bytes::from_static(bytes) }
  }

  #[test]
  fn sniffs_supported_types() {
    assert_eq!(FileType::sniff(b"%PDF-1.7\n"), Some(FileType::Pdf));
    assert_eq!(FileType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(FileType::Jpeg));
    assert_eq!(FileType::sniff(b"\x89PNG\r\n\x1a\n\0\0"), Some(FileType::Png));
    assert_eq!(FileType::sniff(b"GIF89a"), None);
    assert_eq!(FileType::sniff(b""), None);
  }

  #[test]
  fn extension_must_match_content() {
    assert_eq!(file("kk.PDF", b"%PDF-1.4").validate(), Ok("pdf".to_owned()));
    assert_eq!(file("ktp.jpeg", b"\xFF\xD8\xFF\xE1").validate(), Ok("jpeg".to_owned()));
    assert_eq!(file("kk.png", b"%PDF-1.4").validate(), Err(UploadError::ExtensionMismatch));
    assert_eq!(file("kk", b"%PDF-1.4").validate(), Err(UploadError::ExtensionMismatch));
    assert_eq!(file("kk.pdf", b"<html>").validate(), Err(UploadError::Unsupported));
  }

  #[test]
  fn oversized_files_are_refused() {
    let mut big = b"%PDF-".to_vec();
    big.resize(MAX_FILE_SIZE + 1, 0);
    let f = UploadedFile { file_name: "kk.pdf".into(), bytes: Bytes::from(big) };
    assert_eq!(f.validate(), Err(UploadError::TooLarge));
  }

  #[tokio::test]
  async fn saves_under_citizen_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nik = Nik::parse("3172010101800001").unwrap();
    let now = DateTime::from_timestamp_millis(1_740_000_000_123).unwrap();

    let path = save(dir.path(), &nik, DocumentKind::Kk, &file("kk.pdf", b"%PDF-1.4"), "pdf", now)
      .await
      .unwrap();

    assert_eq!(
      path,
      dir.path().join("3172010101800001").join("KK_3172010101800001_1740000000123.pdf")
    );
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

    cleanup(std::slice::from_ref(&path)).await;
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn same_millisecond_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let nik = Nik::parse("3172010101800001").unwrap();
    let now = DateTime::from_timestamp_millis(1_740_000_000_123).unwrap();

    let first = save(dir.path(), &nik, DocumentKind::Kk, &file("a.pdf", b"%PDF-1"), "pdf", now)
      .await
      .unwrap();
    let second = save(dir.path(), &nik, DocumentKind::Kk, &file("b.pdf", b"%PDF-2"), "pdf", now)
      .await
      .unwrap();

    assert_ne!(first, second);
    assert!(second.ends_with("KK_3172010101800001_1740000000123_1.pdf"));
    cleanup(std::slice::from_ref(&second)).await;
    assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1");
  }
}
