// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted in-memory gateway for headless builds and tests.
//
// Devices and scan outcomes are configured up front. Queued outcomes are
// consumed in order; once the queue is empty every scan returns the default
// image (or fails if none was set).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{AcquiredImage, Device, ImageRef};

use crate::traits::DeviceGateway;

type Outcome = std::result::Result<Arc<[u8]>, String>;

/// Gateway whose devices and scan results are set by the caller.
pub struct MemoryGateway {
    devices: Vec<Device>,
    enumeration_error: Option<String>,
    outcomes: Mutex<VecDeque<Outcome>>,
    default_image: Option<Arc<[u8]>>,
    delay: Option<Duration>,
    scans: AtomicUsize,
}

impl MemoryGateway {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            enumeration_error: None,
            outcomes: Mutex::new(VecDeque::new()),
            default_image: None,
            delay: None,
            scans: AtomicUsize::new(0),
        }
    }

    /// Image returned whenever no queued outcome is pending.
    pub fn with_image(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.default_image = Some(bytes.into());
        self
    }

    /// Make `list_devices` fail with `message`.
    pub fn failing_enumeration(mut self, message: impl Into<String>) -> Self {
        self.enumeration_error = Some(message.into());
        self
    }

    /// Block every scan for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful scan returning `bytes`.
    pub fn push_image(&self, bytes: impl Into<Arc<[u8]>>) {
        self.queue().push_back(Ok(bytes.into()));
    }

    /// Queue a failed scan reporting `message`.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.queue().push_back(Err(message.into()));
    }

    /// Number of `acquire_image` calls that reached a known device.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Outcome>> {
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceGateway for MemoryGateway {
    fn backend_name(&self) -> &str {
        "Memory"
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        match &self.enumeration_error {
            Some(message) => Err(ScanwerkError::DeviceEnumeration(message.clone())),
            None => Ok(self.devices.clone()),
        }
    }

    fn acquire_image(&self, device_id: &str) -> Result<AcquiredImage> {
        if !self.devices.iter().any(|device| device.id == device_id) {
            return Err(ScanwerkError::Acquisition("Device not found".into()));
        }
        self.scans.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let outcome = self.queue().pop_front();
        let bytes = match outcome {
            Some(Ok(bytes)) => bytes,
            Some(Err(message)) => return Err(ScanwerkError::Acquisition(message)),
            None => self
                .default_image
                .clone()
                .ok_or_else(|| ScanwerkError::Acquisition("No document in feeder".into()))?,
        };

        Ok(AcquiredImage {
            image: ImageRef::Memory(bytes),
            path: None,
        })
    }
}
