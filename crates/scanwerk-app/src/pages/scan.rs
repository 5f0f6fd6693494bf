// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan page — pick a scanner, acquire pages, arrange them, save as one PDF.

use dioxus::prelude::*;

use scanwerk_bridge::AcquisitionStatus;
use scanwerk_core::human_errors::humanize_error;
use scanwerk_core::types::{Device, Page};
use scanwerk_core::ScanwerkError;
use scanwerk_document::ComposeProgress;
use tokio::sync::watch;

use crate::services::app_services::AppServices;

/// Error banner contents: what happened and what to do about it.
#[derive(Debug, Clone, PartialEq)]
struct Banner {
    message: String,
    suggestion: String,
}

impl From<&ScanwerkError> for Banner {
    fn from(err: &ScanwerkError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: humanize_error(err).suggestion,
        }
    }
}

async fn refresh_devices(
    svc: AppServices,
    mut devices: Signal<Vec<Device>>,
    mut selected: Signal<Option<String>>,
    mut status_msg: Signal<Option<String>>,
) {
    let found = svc.list_devices().await;
    let keep = selected
        .peek()
        .clone()
        .filter(|id| found.iter().any(|d| &d.id == id));
    selected.set(keep.or_else(|| found.first().map(|d| d.id.clone())));
    status_msg.set(Some(if found.is_empty() {
        "No scanners found".into()
    } else {
        format!("Found {} scanner(s)", found.len())
    }));
    devices.set(found);
}

#[component]
pub fn Scan() -> Element {
    let svc = use_context::<AppServices>();
    let devices = use_signal(Vec::<Device>::new);
    let mut selected = use_signal(|| Option::<String>::None);
    let mut pages = use_signal(Vec::<Page>::new);
    let mut acquisition = use_signal(|| AcquisitionStatus::Idle);
    let mut save_progress = use_signal(|| Option::<ComposeProgress>::None);
    let mut banner = use_signal(|| Option::<Banner>::None);
    let mut status_msg = use_signal(|| Option::<String>::None);

    // Enumerate once on first render and preselect the first device.
    {
        let svc = svc.clone();
        use_hook(move || {
            spawn(refresh_devices(svc, devices, selected, status_msg));
        });
    }

    // Mirror the acquirer's status channel into a signal.
    {
        let svc = svc.clone();
        use_hook(move || {
            let mut rx = svc.acquisition_status();
            spawn(async move {
                loop {
                    let current = rx.borrow_and_update().clone();
                    acquisition.set(current);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            });
        });
    }

    let scanning = matches!(*acquisition.read(), AcquisitionStatus::Acquiring { .. });
    let saving = save_progress.read().is_some();
    let busy = scanning || saving || svc.is_acquiring();
    let page_count = pages.read().len();

    rsx! {
        div {
            h1 { "Scan" }

            // Error banner
            if let Some(ref b) = *banner.read() {
                div { style: "display: flex; align-items: flex-start; gap: 8px; padding: 12px; margin-bottom: 12px; border-radius: 8px; background: #ffecec; color: #a00;",
                    div { style: "flex: 1;",
                        strong { "{b.message}" }
                        p { style: "margin: 4px 0 0; font-size: 13px; color: #733;", "{b.suggestion}" }
                    }
                    button {
                        style: "border: none; background: none; color: #a00; font-size: 16px;",
                        onclick: move |_| banner.set(None),
                        "\u{2715}"
                    }
                }
            }

            // Device selection
            div { style: "display: flex; gap: 8px; align-items: center;",
                select {
                    style: "flex: 1; padding: 8px; border-radius: 8px;",
                    disabled: busy,
                    onchange: move |evt: FormEvent| {
                        let id = evt.value();
                        selected.set(if id.is_empty() { None } else { Some(id) });
                    },
                    if devices.read().is_empty() {
                        option { value: "", "No scanners" }
                    }
                    for device in devices.read().iter() {
                        option {
                            key: "{device.id}",
                            value: "{device.id}",
                            selected: selected.read().as_deref() == Some(device.id.as_str()),
                            "{device.name}"
                        }
                    }
                }
                button {
                    style: "padding: 8px 12px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                    disabled: busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            status_msg.set(Some("Looking for scanners...".into()));
                            spawn(refresh_devices(svc.clone(), devices, selected, status_msg));
                        }
                    },
                    "Refresh"
                }
            }

            // Scan button
            button {
                style: "width: 100%; padding: 16px; border-radius: 12px; border: 2px dashed #007aff; color: #007aff; background: white; font-size: 16px; margin: 16px 0;",
                disabled: busy,
                onclick: {
                    let svc = svc.clone();
                    move |_| {
                        let svc = svc.clone();
                        let device = selected.read().clone();
                        status_msg.set(Some("Scanning...".into()));
                        spawn(async move {
                            match svc.scan_page(device.as_deref()).await {
                                Ok(id) => {
                                    tracing::info!(page = %id, "page scanned");
                                    banner.set(None);
                                    status_msg.set(Some("Page added.".into()));
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "scan failed");
                                    banner.set(Some(Banner::from(&e)));
                                    status_msg.set(None);
                                }
                            }
                            pages.set(svc.pages());
                        });
                    }
                },
                if scanning { "Scanning..." } else { "\u{1F4C4} Scan Page" }
            }

            // Scanned pages
            if page_count == 0 {
                p { style: "text-align: center; color: #aaa; margin: 48px 0;",
                    "No pages scanned yet."
                }
            } else {
                h3 { "{page_count} page(s) scanned" }
                div { style: "display: flex; gap: 8px; overflow-x: auto; padding: 8px 0;",
                    for (i, page) in pages.read().iter().enumerate() {
                        {
                            let id = page.id;
                            let label = page
                                .source_path()
                                .and_then(|p| p.file_name())
                                .map(|n| n.to_string_lossy().into_owned())
                                .unwrap_or_else(|| "in memory".into());
                            let first = i == 0;
                            let last = i + 1 == page_count;
                            let svc_left = svc.clone();
                            let svc_right = svc.clone();
                            let svc_delete = svc.clone();
                            rsx! {
                                div { key: "{id}",
                                    style: "min-width: 96px; height: 130px; border: 1px solid #ccc; border-radius: 4px; display: flex; flex-direction: column; align-items: center; justify-content: space-between; padding: 6px; background: #f0f0f0; font-size: 12px;",
                                    span { style: "font-weight: 600;", "P{i + 1}" }
                                    span { style: "color: #888; overflow: hidden; max-width: 90px; text-overflow: ellipsis;", "{label}" }
                                    div { style: "display: flex; gap: 4px;",
                                        button {
                                            disabled: first || busy,
                                            onclick: move |_| {
                                                svc_left.move_page(&id, -1);
                                                pages.set(svc_left.pages());
                                            },
                                            "\u{2190}"
                                        }
                                        button {
                                            disabled: busy,
                                            onclick: move |_| {
                                                svc_delete.remove_page(&id);
                                                pages.set(svc_delete.pages());
                                            },
                                            "\u{1F5D1}"
                                        }
                                        button {
                                            disabled: last || busy,
                                            onclick: move |_| {
                                                svc_right.move_page(&id, 1);
                                                pages.set(svc_right.pages());
                                            },
                                            "\u{2192}"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            // Actions
            div { style: "display: flex; gap: 8px; margin-top: 16px;",
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: none; background: #007aff; color: white;",
                    disabled: page_count == 0 || busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let Some(path) = rfd::FileDialog::new()
                                .set_file_name(svc.default_file_name())
                                .add_filter("PDF", &["pdf"])
                                .save_file()
                            else {
                                return;
                            };
                            let svc = svc.clone();
                            let (tx, mut rx) = watch::channel(ComposeProgress {
                                placed: 0,
                                total: page_count,
                            });
                            save_progress.set(Some(*rx.borrow()));
                            spawn(async move {
                                while rx.changed().await.is_ok() {
                                    let progress = *rx.borrow_and_update();
                                    if save_progress.peek().is_some() {
                                        save_progress.set(Some(progress));
                                    }
                                }
                            });
                            status_msg.set(Some("Saving PDF...".into()));
                            spawn(async move {
                                let result = svc.save_pdf(&path, Some(&tx)).await;
                                drop(tx);
                                match result {
                                    Ok(bytes) => {
                                        tracing::info!(path = %path.display(), bytes, "PDF saved");
                                        status_msg.set(Some(format!("Saved {} ({} KB)", path.display(), bytes / 1024)));
                                    }
                                    Err(e) => {
                                        tracing::warn!(error = %e, "save failed");
                                        banner.set(Some(Banner::from(&e)));
                                        status_msg.set(None);
                                    }
                                }
                                save_progress.set(None);
                            });
                        }
                    },
                    if let Some(p) = *save_progress.read() {
                        "Saving page {p.placed}/{p.total}..."
                    } else {
                        "Save PDF"
                    }
                }
                button {
                    style: "flex: 1; padding: 12px; border-radius: 8px; border: 1px solid #ff3b30; color: #ff3b30; background: white;",
                    disabled: page_count == 0 || busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            match svc.clear_session() {
                                Ok(report) => {
                                    status_msg.set(Some(if report.is_clean() {
                                        "Session cleared.".into()
                                    } else {
                                        format!("Session cleared; {} file(s) could not be deleted.", report.failed)
                                    }));
                                }
                                Err(e) => banner.set(Some(Banner::from(&e))),
                            }
                            pages.set(svc.pages());
                        }
                    },
                    "Clear All"
                }
            }

            // Status
            if let Some(ref msg) = *status_msg.read() {
                p { style: "margin-top: 12px; color: #666; font-size: 14px; text-align: center;",
                    "{msg}"
                }
            }
        }
    }
}
