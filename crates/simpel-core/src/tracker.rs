//! The citizen-facing progress tracker.
//!
//! An application's status is projected onto five fixed stages. A rejected
//! application shows the verification stage as blocked.

use serde::Serialize;

use crate::status::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
  Pending,
  InProgress,
  Completed,
  Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
  pub name:        &'static str,
  pub description: &'static str,
  pub state:       StageState,
  pub note:        Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextStep {
  pub title:       &'static str,
  pub description: &'static str,
  pub primary:     bool,
  pub action_url:  Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
  pub stages:     Vec<Stage>,
  /// Index of the stage the application is currently at.
  pub current:    usize,
  pub next_steps: Vec<NextStep>,
}

const STAGES: [(&str, &str); 5] = [
  ("Pengajuan", "Permohonan diterima"),
  ("Verifikasi", "Verifikasi dokumen"),
  ("Proses", "Pencetakan KTP"),
  ("Siap Ambil", "Siap diambil di kelurahan"),
  ("Selesai", "Selesai"),
];

pub fn progress(status: ApplicationStatus) -> Progress {
  use ApplicationStatus as S;

  let (current, completed) = match status {
    S::Terdaftar => (0, 0),
    S::Verifikasi => (1, 1),
    S::Proses => (2, 2),
    S::SiapAmbil => (3, 3),
    S::Selesai => (4, 5),
    S::Ditolak => (1, 1),
  };

  let stages = STAGES
    .iter()
    .enumerate()
    .map(|(i, &(name, description))| {
      let state = if i < completed {
        StageState::Completed
      } else if i == current && status == S::Ditolak {
        StageState::Blocked
      } else if i == current && i > 0 {
        StageState::InProgress
      } else {
        StageState::Pending
      };
      let note = (state == StageState::Blocked).then_some("Permohonan ditolak.");
      Stage { name, description, state, note }
    })
    .collect();

  Progress { stages, current, next_steps: next_steps(status) }
}

fn next_steps(status: ApplicationStatus) -> Vec<NextStep> {
  match status {
    ApplicationStatus::Verifikasi => vec![NextStep {
      title:       "Tunggu Verifikasi",
      description: "Mohon tunggu petugas memverifikasi dokumen Anda.",
      primary:     false,
      action_url:  None,
    }],
    ApplicationStatus::SiapAmbil => vec![NextStep {
      title:       "Ambil KTP",
      description: "Silakan datang ke kelurahan untuk mengambil KTP.",
      primary:     true,
      action_url:  None,
    }],
    ApplicationStatus::Ditolak => vec![NextStep {
      title:       "Ajukan Ulang",
      description: "Silakan perbaiki dokumen dan ajukan ulang.",
      primary:     true,
      action_url:  Some("/permohonan/baru"),
    }],
    _ => Vec::new(),
  }
}
