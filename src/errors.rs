// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Validation failures raised synchronously on the write path.
///
/// Read and aggregation paths never produce these: missing data there
/// is reported as zero.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} '{name}' already exists")]
    Duplicate { kind: &'static str, name: String },
    #[error("{0}")]
    Validation(String),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }
}
