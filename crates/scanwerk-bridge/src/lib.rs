// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Scanwerk — scanner device gateways.
//!
//! The rest of the application talks to scanners only through the
//! [`traits::DeviceGateway`] capability. Each host platform gets its own
//! implementation; [`acquire::Acquirer`] layers the single-scan-at-a-time
//! rule, timeouts, and status reporting on top of whichever one is active.

pub mod acquire;
pub mod memory;
mod process;
pub mod sane;
pub mod traits;
pub mod wia;

use std::sync::Arc;

use scanwerk_core::SessionStorage;

pub use acquire::{Acquirer, AcquisitionStatus};
pub use memory::MemoryGateway;
pub use traits::DeviceGateway;

/// Returns the gateway for the host operating system.
///
/// Acquired images and helper scripts are written into `storage`.
pub fn platform_gateway(storage: SessionStorage) -> Arc<dyn DeviceGateway> {
    #[cfg(windows)]
    {
        // Windows: PowerShell scripts driving WIA automation objects.
        Arc::new(wia::WiaGateway::new(storage))
    }
    #[cfg(not(windows))]
    {
        // Linux/BSD/macOS: the SANE `scanimage` front end.
        Arc::new(sane::SaneGateway::new(storage))
    }
}
