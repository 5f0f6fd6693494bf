// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows gateway — drives the WIA automation layer through PowerShell.
//
// Each call writes a one-shot script into session storage, runs it with
// `-ExecutionPolicy Bypass -File`, and deletes it once the process exits.
// Enumeration prints JSON on stdout; acquisition writes a JPEG to a path we
// choose and reports failures through `Write-Error`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::storage::SessionStorage;
use scanwerk_core::types::{AcquiredImage, Device, ImageRef};

use crate::process::{self, first_line_or_unknown};
use crate::traits::DeviceGateway;

/// WIA device type value for scanners.
const WIA_SCANNER_TYPE: u32 = 1;

/// WIA format GUID for JPEG output.
const WIA_FORMAT_JPEG: &str = "{B96B3CAE-0728-11D3-9D7B-0000F81EF32E}";

/// Gateway backed by Windows Image Acquisition.
pub struct WiaGateway {
    storage: SessionStorage,
    powershell: PathBuf,
}

impl WiaGateway {
    pub fn new(storage: SessionStorage) -> Self {
        Self {
            storage,
            powershell: powershell_path(),
        }
    }

    fn run_script(&self, prefix: &str, script: &str) -> Result<process::CommandOutput> {
        let path = self.storage.script_path(prefix, "ps1")?;
        std::fs::write(&path, script)?;
        let output = process::run(
            &self.powershell,
            [
                OsStr::new("-NoProfile"),
                OsStr::new("-ExecutionPolicy"),
                OsStr::new("Bypass"),
                OsStr::new("-File"),
                path.as_os_str(),
            ],
        );
        if let Err(err) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %err, "could not remove gateway script");
        }
        output
    }
}

impl DeviceGateway for WiaGateway {
    fn backend_name(&self) -> &str {
        "WIA"
    }

    #[instrument(skip(self))]
    fn list_devices(&self) -> Result<Vec<Device>> {
        let output = self.run_script("list", &list_script())?;
        if !output.success {
            return Err(ScanwerkError::DeviceEnumeration(format!(
                "PowerShell exited with {:?}: {}",
                output.code,
                first_line_or_unknown(&output.stderr)
            )));
        }
        let devices = parse_device_list(&output.stdout)?;
        debug!(count = devices.len(), "WIA scanners enumerated");
        Ok(devices)
    }

    #[instrument(skip(self))]
    fn acquire_image(&self, device_id: &str) -> Result<AcquiredImage> {
        let target = self.storage.scan_path("jpg")?;
        let output = self.run_script("scan", &acquire_script(device_id, &target))?;
        if !output.success {
            return Err(ScanwerkError::Acquisition(script_error_message(&output.stderr)));
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

fn powershell_path() -> PathBuf {
    std::env::var_os("SystemRoot")
        .map(|root| {
            PathBuf::from(root)
                .join("System32")
                .join("WindowsPowerShell")
                .join("v1.0")
                .join("powershell.exe")
        })
        .unwrap_or_else(|| PathBuf::from("powershell.exe"))
}

/// Quote `value` as a PowerShell single-quoted literal.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn list_script() -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$manager = New-Object -ComObject WIA.DeviceManager
$devices = @()
foreach ($info in $manager.DeviceInfos) {{
    if ($info.Type -eq {WIA_SCANNER_TYPE}) {{
        $name = 'Unknown'
        try {{ $name = $info.Properties.Item('Name').Value }} catch {{}}
        $devices += @{{ id = $info.DeviceID; name = $name }}
    }}
}}
ConvertTo-Json -InputObject $devices -Compress
"#
    )
}

fn acquire_script(device_id: &str, target: &Path) -> String {
    let id = ps_quote(device_id);
    let out = ps_quote(&target.display().to_string());
    format!(
        r#"$ErrorActionPreference = 'Stop'
try {{
    $manager = New-Object -ComObject WIA.DeviceManager
    $info = $null
    foreach ($candidate in $manager.DeviceInfos) {{
        if ($candidate.DeviceID -eq {id}) {{ $info = $candidate }}
    }}
    if ($null -eq $info) {{ throw 'Device not found' }}
    $device = $info.Connect()
    $item = $device.Items.Item(1)
    $image = $item.Transfer()
    if ($image.FormatID -ne '{WIA_FORMAT_JPEG}') {{
        $process = New-Object -ComObject WIA.ImageProcess
        $process.Filters.Add($process.FilterInfos.Item('Convert').FilterID)
        $process.Filters.Item(1).Properties.Item('FormatID').Value = '{WIA_FORMAT_JPEG}'
        $image = $process.Apply($image)
    }}
    if (Test-Path -LiteralPath {out}) {{ Remove-Item -LiteralPath {out} }}
    $image.SaveFile({out})
}} catch {{
    Write-Error $_.Exception.Message
    exit 1
}}
"#
    )
}

#[derive(Deserialize)]
struct WiaDevice {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WiaListing {
    Many(Vec<WiaDevice>),
    One(WiaDevice),
}

/// Parse enumeration output. `ConvertTo-Json` emits a bare object when only
/// one scanner is present, an array otherwise, and nothing for none.
fn parse_device_list(stdout: &str) -> Result<Vec<Device>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let listing: WiaListing = serde_json::from_str(trimmed)?;
    let raw = match listing {
        WiaListing::Many(devices) => devices,
        WiaListing::One(device) => vec![device],
    };
    Ok(raw
        .into_iter()
        .map(|device| {
            let name = device
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Unknown".into());
            Device::new(device.id, name)
        })
        .collect())
}

/// Extract the message passed to `Write-Error`.
///
/// PowerShell prefixes it with `<script path> : ` and appends category lines.
fn script_error_message(stderr: &str) -> String {
    let line = first_line_or_unknown(stderr);
    match line.split_once(".ps1 : ") {
        Some((_, message)) if !message.trim().is_empty() => message.trim().to_owned(),
        _ => line,
    }
}
