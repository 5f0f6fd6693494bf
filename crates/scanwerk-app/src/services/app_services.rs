// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — owns the scan session and the acquisition
// controller, and provides async-friendly methods for the Dioxus UI to call.
//
// The session sits behind a std `Mutex`; every operation on it is short and
// never held across an await.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use scanwerk_bridge::{Acquirer, AcquisitionStatus, DeviceGateway, MemoryGateway, platform_gateway};
use scanwerk_core::error::Result;
use scanwerk_core::types::{Device, Page, PageId, default_export_file_name};
use scanwerk_core::{AppConfig, CleanupReport, ScanSession, ScanwerkError, SessionStorage};
use scanwerk_document::{ComposeOptions, ComposeProgress, export_to_file};
use tokio::sync::watch;
use tracing::{info, warn};

use super::data_dir;

/// Shared application services accessible from all Dioxus components via
/// `use_context::<AppServices>()`.
///
/// All fields are Arc-wrapped so the struct clones cheaply into closures.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<Mutex<ScanSession>>,
    acquirer: Arc<Acquirer>,
    config: Arc<AppConfig>,
}

impl AppServices {
    /// Initialise all services. Call once at app startup.
    ///
    /// Loads the persisted config, creates the session directory under the OS
    /// temp dir, and selects the gateway for this platform.
    pub fn init() -> Result<Self> {
        let dir = data_dir::config_dir();
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        if !dir.join(CONFIG_FILE).exists() {
            // Write defaults so there is a file to edit.
            if let Err(e) = persist_config(&dir, &config) {
                warn!(error = %e, "could not write default config");
            }
        }
        let storage = SessionStorage::in_temp_dir(&config.session_dir_name)?;
        let gateway = platform_gateway(storage.clone());

        Ok(Self::with_gateway(gateway, Some(storage), config))
    }

    /// Services with no devices and no session directory.
    pub fn fallback() -> Self {
        Self::with_gateway(
            Arc::new(MemoryGateway::new(Vec::new())),
            None,
            AppConfig::default(),
        )
    }

    pub fn with_gateway(
        gateway: Arc<dyn DeviceGateway>,
        storage: Option<SessionStorage>,
        config: AppConfig,
    ) -> Self {
        let session = match storage {
            Some(storage) => ScanSession::with_storage(storage),
            None => ScanSession::new(),
        };
        Self {
            session: Arc::new(Mutex::new(session)),
            acquirer: Arc::new(Acquirer::new(gateway, config.acquire_timeout())),
            config: Arc::new(config),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.acquirer.backend_name()
    }

    // -- Devices -------------------------------------------------------------

    /// Enumerate scanners. Never fails; problems are logged.
    pub async fn list_devices(&self) -> Vec<Device> {
        self.acquirer.list_devices().await
    }

    // -- Acquisition ---------------------------------------------------------

    /// Scan one page from `device_id` and append it to the session.
    pub async fn scan_page(&self, device_id: Option<&str>) -> Result<PageId> {
        self.acquirer.scan_into(device_id, &self.session).await
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquirer.is_busy()
    }

    /// Live acquisition state for the UI.
    pub fn acquisition_status(&self) -> watch::Receiver<AcquisitionStatus> {
        self.acquirer.subscribe()
    }

    // -- Session -------------------------------------------------------------

    /// Current pages in session order.
    pub fn pages(&self) -> Vec<Page> {
        self.session().snapshot()
    }

    /// Delete a page. Unknown ids are ignored.
    pub fn remove_page(&self, id: &PageId) -> bool {
        self.session().remove(id).is_some()
    }

    /// Move a page `offset` slots (negative moves left). Moves past either end
    /// or for unknown ids do nothing.
    pub fn move_page(&self, id: &PageId, offset: isize) -> bool {
        let mut session = self.session();
        let Some(from) = session.position(id) else {
            return false;
        };
        let Some(to) = from.checked_add_signed(offset) else {
            return false;
        };
        let Some(target) = session.pages().get(to).map(|page| page.id) else {
            return false;
        };
        session.reorder(id, &target)
    }

    /// Drop all pages and delete acquired files. Refused while scanning.
    pub fn clear_session(&self) -> Result<CleanupReport> {
        let report = self.acquirer.clear_session(&self.session)?;
        if report.is_clean() {
            info!(removed = report.removed, "session cleared");
        } else {
            warn!(removed = report.removed, failed = report.failed, "session cleared with leftovers");
        }
        Ok(report)
    }

    // -- Export --------------------------------------------------------------

    /// Suggested file name for the save dialog.
    pub fn default_file_name(&self) -> String {
        default_export_file_name(Utc::now())
    }

    /// Compose the current pages into a PDF at `path`. Returns the byte count.
    ///
    /// Per-page progress is published on `progress` when given.
    pub async fn save_pdf(&self, path: &Path, progress: Option<&watch::Sender<ComposeProgress>>) -> Result<usize> {
        let pages = self.pages();
        if pages.is_empty() {
            return Err(ScanwerkError::NothingToSave);
        }
        let options = ComposeOptions::from_config(self.config());
        export_to_file(&pages, &options, path, progress).await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn session(&self) -> std::sync::MutexGuard<'_, ScanSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(dir: &Path) -> Option<AppConfig> {
    let path = dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config");
            None
        }
    }
}

fn persist_config(dir: &Path, config: &AppConfig) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use scanwerk_core::PaperSize;
    use std::io::Cursor;

    fn jpeg() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 60, Rgb([200, 200, 190])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .expect("encode");
        buf
    }

    fn services(dir: &Path) -> (AppServices, Arc<MemoryGateway>) {
        let gateway = Arc::new(
            MemoryGateway::new(vec![Device::new("a", "Scanner A"), Device::new("canon", "Canon")])
                .with_image(jpeg()),
        );
        let storage = SessionStorage::at(dir.join("session")).unwrap();
        let svc = AppServices::with_gateway(gateway.clone(), Some(storage), AppConfig::default());
        (svc, gateway)
    }

    #[tokio::test]
    async fn scan_move_remove_and_save() {
        let tmp = tempfile::tempdir().unwrap();
        let (svc, _) = services(tmp.path());

        let p1 = svc.scan_page(Some("a")).await.unwrap();
        let p2 = svc.scan_page(Some("a")).await.unwrap();
        let p3 = svc.scan_page(Some("canon")).await.unwrap();

        assert!(svc.move_page(&p3, -2));
        let order: Vec<_> = svc.pages().iter().map(|p| p.id).collect();
        assert_eq!(order, [p3, p1, p2]);

        assert!(!svc.move_page(&p3, -1));
        assert!(!svc.move_page(&p2, 1));
        assert!(svc.remove_page(&p1));
        assert!(!svc.remove_page(&p1));
        assert_eq!(svc.pages().len(), 2);

        let out = tmp.path().join(svc.default_file_name());
        let (tx, rx) = watch::channel(ComposeProgress::default());
        let bytes = svc.save_pdf(&out, Some(&tx)).await.unwrap();
        assert_eq!(*rx.borrow(), ComposeProgress { placed: 2, total: 2 });
        assert!(bytes > 0);
        let doc = lopdf::Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        // Saving does not consume the session.
        assert_eq!(svc.pages().len(), 2);
    }

    #[tokio::test]
    async fn saving_empty_session_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (svc, _) = services(tmp.path());
        let out = tmp.path().join("empty.pdf");
        assert!(matches!(svc.save_pdf(&out, None).await, Err(ScanwerkError::NothingToSave)));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn failed_scan_leaves_session_and_clear_empties_it() {
        let tmp = tempfile::tempdir().unwrap();
        let (svc, gateway) = services(tmp.path());
        svc.scan_page(Some("a")).await.unwrap();

        let status = svc.acquisition_status();
        gateway.push_failure("Paper jam");
        let err = svc.scan_page(Some("a")).await.unwrap_err();
        assert_eq!(err.to_string(), "Paper jam");
        assert_eq!(
            *status.borrow(),
            AcquisitionStatus::Failed {
                message: "Paper jam".into()
            }
        );
        assert_eq!(svc.pages().len(), 1);

        let report = svc.clear_session().unwrap();
        assert!(report.is_clean());
        assert_eq!(svc.pages().len(), 0);
    }

    #[test]
    fn config_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            paper_size: PaperSize::Letter,
            document_title: "Receipts".into(),
            ..AppConfig::default()
        };
        persist_config(tmp.path(), &config).unwrap();
        assert_eq!(load_config(tmp.path()), Some(config));
    }

    #[test]
    fn malformed_config_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(load_config(tmp.path()), None);
        assert_eq!(load_config(&tmp.path().join("missing")), None);
    }

    #[tokio::test]
    async fn fallback_has_no_devices() {
        let svc = AppServices::fallback();
        assert!(svc.list_devices().await.is_empty());
        assert!(matches!(svc.scan_page(None).await, Err(ScanwerkError::NoDeviceSelected)));
    }
}
