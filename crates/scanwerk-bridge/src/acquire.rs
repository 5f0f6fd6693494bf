// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Acquisition controller — at most one scan in flight, bounded by a timeout,
// with status published for the UI.
//
// Gateway calls run on tokio's blocking pool. A timed-out call cannot be
// cancelled, so the in-flight flag stays set until the device call actually
// returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::session::ScanSession;
use scanwerk_core::storage::CleanupReport;
use scanwerk_core::types::{AcquiredImage, Device, PageId};

use crate::traits::DeviceGateway;

/// What the acquisition side is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AcquisitionStatus {
    #[default]
    Idle,
    Acquiring { device_id: String },
    Failed { message: String },
}

/// Clears the in-flight flag when the last holder drops it.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serialises scans against one gateway.
pub struct Acquirer {
    gateway: Arc<dyn DeviceGateway>,
    busy: Arc<AtomicBool>,
    timeout: Duration,
    status: watch::Sender<AcquisitionStatus>,
}

impl Acquirer {
    pub fn new(gateway: Arc<dyn DeviceGateway>, timeout: Duration) -> Self {
        let (status, _) = watch::channel(AcquisitionStatus::Idle);
        Self {
            gateway,
            busy: Arc::new(AtomicBool::new(false)),
            timeout,
            status,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.gateway.backend_name()
    }

    /// True while a device call is outstanding, including one that timed out.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<AcquisitionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AcquisitionStatus {
        self.status.borrow().clone()
    }

    /// Enumerate devices. Failures are logged and yield an empty list.
    #[instrument(skip(self), fields(backend = self.gateway.backend_name()))]
    pub async fn list_devices(&self) -> Vec<Device> {
        let gateway = Arc::clone(&self.gateway);
        match tokio::task::spawn_blocking(move || gateway.list_devices()).await {
            Ok(Ok(devices)) => {
                info!(count = devices.len(), "devices listed");
                devices
            }
            Ok(Err(err)) => {
                warn!(error = %err, "device enumeration failed");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "device enumeration task failed");
                Vec::new()
            }
        }
    }

    /// Scan one page from `device_id` without touching any session.
    pub async fn acquire_image(&self, device_id: &str) -> Result<AcquiredImage> {
        let (outcome, _in_flight) = self.run_acquisition(device_id).await?;
        outcome
    }

    /// Scan one page and append it to `session`.
    ///
    /// The session is unchanged on any failure.
    #[instrument(skip(self, session))]
    pub async fn scan_into(&self, device_id: Option<&str>, session: &Mutex<ScanSession>) -> Result<PageId> {
        let device_id = device_id
            .filter(|id| !id.is_empty())
            .ok_or(ScanwerkError::NoDeviceSelected)?;

        // Held until the page is in the session so scans land in call order.
        let (outcome, _in_flight) = self.run_acquisition(device_id).await?;
        let page = outcome?.into_page()?;
        let id = page.id;

        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.append(page)?;
        info!(page = %id, pages = session.len(), "page appended");
        Ok(id)
    }

    /// Empty `session` and delete its storage. Refused while a scan is in flight.
    ///
    /// The in-flight flag is held for the whole clear, so no scan can start
    /// writing into the directory being deleted.
    pub fn clear_session(&self, session: &Mutex<ScanSession>) -> Result<CleanupReport> {
        let _claim = self.claim()?;
        let report = session.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.status.send_replace(AcquisitionStatus::Idle);
        Ok(report)
    }

    /// Take the in-flight flag, or fail if a scan or clear already holds it.
    fn claim(&self) -> Result<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(Arc::clone(&self.busy)))
            .map_err(|_| ScanwerkError::AcquisitionInProgress)
    }

    /// Claim the in-flight flag and run the device call.
    ///
    /// The outer error covers rejection before the device is touched; the
    /// inner result is the device outcome.
    async fn run_acquisition(&self, device_id: &str) -> Result<(Result<AcquiredImage>, Arc<InFlight>)> {
        if device_id.is_empty() {
            return Err(ScanwerkError::NoDeviceSelected);
        }
        let in_flight = Arc::new(self.claim()?);

        self.status.send_replace(AcquisitionStatus::Acquiring {
            device_id: device_id.to_owned(),
        });
        info!(device = device_id, backend = self.gateway.backend_name(), "acquisition started");

        let gateway = Arc::clone(&self.gateway);
        let id = device_id.to_owned();
        let held = Arc::clone(&in_flight);
        let task = tokio::task::spawn_blocking(move || {
            let _held = held;
            gateway.acquire_image(&id)
        });

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ScanwerkError::Acquisition(format!("scanner task failed: {join_err}"))),
            Err(_) => Err(ScanwerkError::Acquisition(format!(
                "Scan timed out after {} s",
                self.timeout.as_secs()
            ))),
        };

        match &outcome {
            Ok(_) => {
                self.status.send_replace(AcquisitionStatus::Idle);
            }
            Err(err) => {
                warn!(device = device_id, error = %err, "acquisition failed");
                self.status.send_replace(AcquisitionStatus::Failed {
                    message: err.to_string(),
                });
            }
        }
        Ok((outcome, in_flight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGateway;

    fn acquirer(gateway: MemoryGateway) -> (Acquirer, Arc<MemoryGateway>) {
        let gateway = Arc::new(gateway);
        let acq = Acquirer::new(gateway.clone(), Duration::from_secs(5));
        (acq, gateway)
    }

    fn canon() -> MemoryGateway {
        MemoryGateway::new(vec![Device::new("canon-1", "Canon LiDE 300")]).with_image(b"jpeg-bytes".to_vec())
    }

    #[tokio::test]
    async fn two_scans_append_two_distinct_pages() {
        let (acq, _) = acquirer(canon());
        let session = Mutex::new(ScanSession::new());

        let devices = acq.list_devices().await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Canon LiDE 300");

        let first = acq.scan_into(Some("canon-1"), &session).await.unwrap();
        let second = acq.scan_into(Some("canon-1"), &session).await.unwrap();

        let pages = session.lock().unwrap().snapshot();
        assert_eq!(pages.len(), 2);
        assert_ne!(first, second);
        assert_eq!(pages[0].id, first);
        assert_eq!(pages[1].id, second);
        assert_eq!(acq.status(), AcquisitionStatus::Idle);
        assert!(!acq.is_busy());
    }

    #[tokio::test]
    async fn device_error_is_reported_verbatim_and_session_untouched() {
        let (acq, gw) = acquirer(canon());
        let session = Mutex::new(ScanSession::new());
        acq.scan_into(Some("canon-1"), &session).await.unwrap();
        let before = session.lock().unwrap().snapshot();

        gw.push_failure("Device not found");
        let err = acq.scan_into(Some("canon-1"), &session).await.unwrap_err();

        assert!(matches!(err, ScanwerkError::Acquisition(ref m) if m == "Device not found"));
        assert_eq!(err.to_string(), "Device not found");
        assert_eq!(session.lock().unwrap().snapshot(), before);
        assert_eq!(
            acq.status(),
            AcquisitionStatus::Failed {
                message: "Device not found".into()
            }
        );
        assert!(!acq.is_busy());
    }

    #[tokio::test]
    async fn enumeration_failure_yields_empty_list() {
        let (acq, _) = acquirer(canon().failing_enumeration("WIA service not running"));
        assert!(acq.list_devices().await.is_empty());
    }

    #[tokio::test]
    async fn missing_device_selection_is_rejected() {
        let (acq, gw) = acquirer(canon());
        let session = Mutex::new(ScanSession::new());

        assert!(matches!(
            acq.scan_into(None, &session).await,
            Err(ScanwerkError::NoDeviceSelected)
        ));
        assert!(matches!(
            acq.scan_into(Some(""), &session).await,
            Err(ScanwerkError::NoDeviceSelected)
        ));
        assert!(matches!(acq.acquire_image("").await, Err(ScanwerkError::NoDeviceSelected)));
        assert_eq!(gw.scan_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_scan_is_rejected() {
        let (acq, gw) = acquirer(canon().with_delay(Duration::from_millis(200)));
        let session = Mutex::new(ScanSession::new());

        let (first, second) = tokio::join!(
            acq.scan_into(Some("canon-1"), &session),
            acq.scan_into(Some("canon-1"), &session),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(ScanwerkError::AcquisitionInProgress)));
        assert_eq!(session.lock().unwrap().len(), 1);
        assert_eq!(gw.scan_count(), 1);
    }

    #[tokio::test]
    async fn timeout_keeps_flag_until_device_returns() {
        let gateway = Arc::new(canon().with_delay(Duration::from_millis(400)));
        let acq = Acquirer::new(gateway, Duration::from_millis(50));
        let session = Mutex::new(ScanSession::new());

        let err = acq.scan_into(Some("canon-1"), &session).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(session.lock().unwrap().is_empty());

        assert!(acq.is_busy());
        assert!(matches!(
            acq.scan_into(Some("canon-1"), &session).await,
            Err(ScanwerkError::AcquisitionInProgress)
        ));

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!acq.is_busy());
    }

    #[tokio::test]
    async fn clear_is_refused_during_scan() {
        let (acq, _) = acquirer(canon().with_delay(Duration::from_millis(200)));
        let session = Mutex::new(ScanSession::new());

        let (scan, cleared) = tokio::join!(acq.scan_into(Some("canon-1"), &session), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            acq.clear_session(&session)
        });

        assert!(scan.is_ok());
        assert!(matches!(cleared, Err(ScanwerkError::AcquisitionInProgress)));
        assert_eq!(session.lock().unwrap().len(), 1);

        let report = acq.clear_session(&session).unwrap();
        assert!(report.is_clean());
        assert!(session.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scan_cannot_start_while_clear_waits_for_session() {
        let (acq, gw) = acquirer(canon());
        let acq = Arc::new(acq);
        let session = Arc::new(Mutex::new(ScanSession::new()));

        // Park the clear on the session lock.
        let guard = session.lock().unwrap();
        let clearing = {
            let acq = Arc::clone(&acq);
            let session = Arc::clone(&session);
            std::thread::spawn(move || acq.clear_session(&session))
        };
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !acq.is_busy() {
            assert!(std::time::Instant::now() < deadline, "clear never claimed the flag");
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(matches!(
            acq.acquire_image("canon-1").await,
            Err(ScanwerkError::AcquisitionInProgress)
        ));
        drop(guard);

        assert!(clearing.join().unwrap().is_ok());
        assert!(!acq.is_busy());
        assert_eq!(gw.scan_count(), 0);
        assert!(acq.scan_into(Some("canon-1"), &session).await.is_ok());
    }

    #[tokio::test]
    async fn status_is_published_to_subscribers() {
        let (acq, _) = acquirer(canon().with_delay(Duration::from_millis(100)));
        let rx = acq.subscribe();

        let (result, seen) = tokio::join!(acq.acquire_image("canon-1"), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            rx.borrow().clone()
        });

        assert!(result.is_ok());
        assert_eq!(
            seen,
            AcquisitionStatus::Acquiring {
                device_id: "canon-1".into()
            }
        );
        assert_eq!(*rx.borrow(), AcquisitionStatus::Idle);
    }
}
