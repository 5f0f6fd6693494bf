// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SANE gateway — shells out to the `scanimage` front end.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::storage::SessionStorage;
use scanwerk_core::types::{AcquiredImage, Device, ImageRef};

use crate::process::{self, first_line_or_unknown};
use crate::traits::DeviceGateway;

/// `scanimage -f` template: one `id<TAB>vendor model` line per device.
const LIST_FORMAT: &str = "%d\t%v %m%n";

/// Gateway backed by SANE's `scanimage` command.
pub struct SaneGateway {
    storage: SessionStorage,
    program: PathBuf,
}

impl SaneGateway {
    pub fn new(storage: SessionStorage) -> Self {
        Self::with_program(storage, "scanimage")
    }

    /// Use a specific `scanimage` binary.
    pub fn with_program(storage: SessionStorage, program: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            program: program.into(),
        }
    }
}

impl DeviceGateway for SaneGateway {
    fn backend_name(&self) -> &str {
        "SANE"
    }

    #[instrument(skip(self))]
    fn list_devices(&self) -> Result<Vec<Device>> {
        let output = process::run(&self.program, ["-f", LIST_FORMAT])?;
        if !output.success {
            return Err(ScanwerkError::DeviceEnumeration(format!(
                "scanimage exited with {:?}: {}",
                output.code,
                first_line_or_unknown(&output.stderr)
            )));
        }
        let devices = parse_device_list(&output.stdout);
        debug!(count = devices.len(), "SANE devices enumerated");
        Ok(devices)
    }

    #[instrument(skip(self))]
    fn acquire_image(&self, device_id: &str) -> Result<AcquiredImage> {
        let target = self.storage.scan_path("jpg")?;
        let output = process::run(&self.program, acquire_args(device_id, &target))?;
        if !output.success {
            return Err(ScanwerkError::Acquisition(error_message(&output.stderr)));
        }

        match std::fs::metadata(&target) {
            Ok(meta) if meta.len() > 0 => {
                info!(path = %target.display(), bytes = meta.len(), "page acquired");
                Ok(AcquiredImage {
                    image: ImageRef::File(target.clone()),
                    path: Some(target),
                })
            }
            _ => Err(ScanwerkError::Acquisition("Scanner produced no image".into())),
        }
    }
}

fn acquire_args(device_id: &str, target: &Path) -> Vec<OsString> {
    let mut output_file = OsString::from("--output-file=");
    output_file.push(target.as_os_str());
    vec![
        format!("--device-name={device_id}").into(),
        "--format=jpeg".into(),
        output_file,
    ]
}

fn parse_device_list(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, name) = line.split_once('\t').unwrap_or((line, ""));
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            let name = name.trim();
            Some(Device::new(id, if name.is_empty() { "Unknown" } else { name }))
        })
        .collect()
}

/// `scanimage: open of device x failed: Invalid argument` → the part after the
/// program name.
fn error_message(stderr: &str) -> String {
    let line = first_line_or_unknown(stderr);
    match line.strip_prefix("scanimage:") {
        Some(rest) if !rest.trim().is_empty() => rest.trim().to_owned(),
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_lines_become_devices() {
        let out = "genesys:libusb:001:004\tCanon LiDE 220\nescl:http://10.0.0.9:80\t \n\n";
        let devices = parse_device_list(out);
        assert_eq!(
            devices,
            vec![
                Device::new("genesys:libusb:001:004", "Canon LiDE 220"),
                Device::new("escl:http://10.0.0.9:80", "Unknown"),
            ]
        );
    }

    #[test]
    fn acquire_args_name_device_and_target() {
        let args = acquire_args("test:0", Path::new("/tmp/s/scan.jpg"));
        assert_eq!(
            args,
            vec![
                OsString::from("--device-name=test:0"),
                OsString::from("--format=jpeg"),
                OsString::from("--output-file=/tmp/s/scan.jpg"),
            ]
        );
    }

    #[test]
    fn program_prefix_is_stripped_from_errors() {
        assert_eq!(
            error_message("scanimage: open of device x failed: Invalid argument\n"),
            "open of device x failed: Invalid argument"
        );
        assert_eq!(error_message(""), "Unknown error");
    }

    #[test]
    fn missing_binary_is_platform_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = SessionStorage::at(tmp.path()).unwrap();
        let gw = SaneGateway::with_program(storage, tmp.path().join("no-scanimage"));
        assert!(matches!(gw.list_devices(), Err(ScanwerkError::PlatformUnavailable)));
        assert!(matches!(gw.acquire_image("test:0"), Err(ScanwerkError::PlatformUnavailable)));
    }
}
