// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT_TRACING: Once = Once::new();

pub const LOG_ENV: &str = "FINTRACK_LOG";
const DEFAULT_FILTER: &str = "fintrack=warn";

/// Installs the global subscriber once. Logs go to stderr so `--json`
/// output on stdout stays machine readable.
pub fn init() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        tracing::debug!("tracing initialized");
    });
}
