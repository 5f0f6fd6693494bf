// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanning UI.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the UI presents it; none of these end the session.

use crate::error::ScanwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Device busy, transfer hiccup — trying again usually works.
    Transient,
    /// User must do something (select a scanner, wait for the current scan).
    ActionRequired,
    /// Cannot be fixed by retrying — unreadable image, unsupported platform.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying the same action again may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        // -- Device errors --
        ScanwerkError::DeviceEnumeration(_) => HumanError {
            message: "Failed to load scanners.".into(),
            suggestion: "Make sure the scanner is connected and switched on, and that the system scanning service is enabled, then refresh.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::Acquisition(detail) => humanize_acquisition_error(detail),

        ScanwerkError::AcquisitionInProgress => HumanError {
            message: "A page is already being scanned.".into(),
            suggestion: "Wait for the current scan to finish, then try again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::NoDeviceSelected => HumanError {
            message: "No scanner selected.".into(),
            suggestion: "Please connect a scanner and refresh.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Session errors --
        ScanwerkError::DuplicatePage(_) => HumanError {
            message: "That page is already in the document.".into(),
            suggestion: "Scan the page again to add a new copy.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Document errors --
        ScanwerkError::NothingToSave => HumanError {
            message: "There's nothing to save yet.".into(),
            suggestion: "Scan at least one page, then save the PDF.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Compose(_) | ScanwerkError::PdfError(_) => HumanError {
            message: "Failed to save PDF.".into(),
            suggestion: "Your pages are still here. Try saving again, or remove the page that can't be read.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::ImageError(_) => HumanError {
            message: "One of the scanned pages couldn't be read.".into(),
            suggestion: "Delete that page and scan it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Storage --
        ScanwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A scanned file is missing.".into(),
                suggestion: "It may have been deleted. Scan the page again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to write there.".into(),
                suggestion: "Choose a different folder and save again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        ScanwerkError::Serialization(_) => HumanError {
            message: "The scanner sent a reply the app couldn't understand.".into(),
            suggestion: "Refresh the scanner list and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Platform --
        ScanwerkError::PlatformUnavailable => HumanError {
            message: "Scanning isn't available on this computer.".into(),
            suggestion: "Install the system scanning tools for your operating system.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Map gateway failure text to a friendlier message. The raw detail is kept
/// in the suggestion so nothing the device said is lost.
fn humanize_acquisition_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("not found") || lower.contains("no devices") {
        HumanError {
            message: "The scanner couldn't be found.".into(),
            suggestion: format!("Check the cable or network connection, then refresh the scanner list. ({detail})"),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("busy") || lower.contains("in use") {
        HumanError {
            message: "The scanner is busy.".into(),
            suggestion: format!("Wait a moment and scan again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("paper") || lower.contains("feeder") || lower.contains("jam") {
        HumanError {
            message: "The scanner has a paper problem.".into(),
            suggestion: format!("Check the document feeder or glass, then scan again. ({detail})"),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("timed out") {
        HumanError {
            message: "The scanner didn't finish in time.".into(),
            suggestion: "Check the scanner for messages, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "Scanning failed.".into(),
            suggestion: format!("Try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_keeps_detail() {
        let err = ScanwerkError::Acquisition("Device not found".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("Device not found"));
    }

    #[test]
    fn no_device_is_action_required() {
        let human = humanize_error(&ScanwerkError::NoDeviceSelected);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn busy_scanner_is_transient() {
        let human = humanize_error(&ScanwerkError::Acquisition("WIA device busy".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn compose_failure_is_retriable() {
        let human = humanize_error(&ScanwerkError::Compose("page 2: bad data".into()));
        assert!(human.retriable);
    }

    #[test]
    fn bad_image_is_permanent() {
        let human = humanize_error(&ScanwerkError::ImageError("truncated".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }
}
