// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic device gateway trait.

use scanwerk_core::error::Result;
use scanwerk_core::types::{AcquiredImage, Device};

/// Access to physical or virtual scanning devices.
///
/// Calls block for as long as the hardware takes; async callers go through
/// [`crate::acquire::Acquirer`], which moves them onto the blocking pool.
pub trait DeviceGateway: Send + Sync {
    /// Short backend name for logs (e.g. "WIA", "SANE").
    fn backend_name(&self) -> &str;

    /// Enumerate scanners currently reachable. May be empty.
    fn list_devices(&self) -> Result<Vec<Device>>;

    /// Scan a single page from `device_id`.
    ///
    /// On failure the error is `ScanwerkError::Acquisition` carrying the
    /// device's own message.
    fn acquire_image(&self, device_id: &str) -> Result<AcquiredImage>;
}
