// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export pipeline — resolve each page's image reference and feed the
// compositor strictly in session order.
//
// Resolution (file reads) runs on tokio tasks ahead of the compositor, bounded
// by a prefetch window so peak memory stays at a few pages. Placement and
// serialisation run on the blocking pool. Any failure aborts the whole export;
// outstanding reads are cancelled.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{AppConfig, ImageRef, Page, PaperSize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::pdf::compositor::PdfCompositor;
use crate::pdf::layout::Placement;

/// Knobs for a single export.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub paper_size: PaperSize,
    pub title: String,
    /// Pages resolved ahead of the one being placed (at least 1).
    pub prefetch: usize,
}

impl ComposeOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            paper_size: config.paper_size,
            title: config.document_title.clone(),
            prefetch: config.prefetch_window(),
        }
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Export progress published on a `watch` channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeProgress {
    pub placed: usize,
    pub total: usize,
}

/// Load the bytes behind an image reference.
pub async fn resolve_image(image: ImageRef) -> Result<Arc<[u8]>> {
    match image {
        ImageRef::Memory(bytes) => Ok(bytes),
        ImageRef::File(path) => {
            let bytes = tokio::fs::read(&path).await.map_err(|err| {
                ScanwerkError::Compose(format!("cannot read {}: {err}", path.display()))
            })?;
            Ok(bytes.into())
        }
    }
}

/// Compose `pages` into PDF bytes in the given order.
///
/// `pages` should be a session snapshot; the session itself is never touched.
/// Decoding, compression and serialisation run on the blocking pool so the
/// executor stays responsive.
#[instrument(skip_all, fields(pages = pages.len(), prefetch = options.prefetch))]
pub async fn compose_pages(
    pages: &[Page],
    options: &ComposeOptions,
    progress: Option<&watch::Sender<ComposeProgress>>,
) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(ScanwerkError::NothingToSave);
    }

    let total = pages.len();
    let window = options.prefetch.max(1);
    let mut compositor = PdfCompositor::new(options.paper_size);
    compositor.set_title(options.title.clone());

    let mut upcoming = pages.iter();
    let mut in_flight: VecDeque<JoinHandle<Result<Arc<[u8]>>>> = VecDeque::with_capacity(window);

    for index in 0..total {
        while in_flight.len() < window {
            let Some(page) = upcoming.next() else { break };
            in_flight.push_back(tokio::spawn(resolve_image(page.image.clone())));
        }

        let Some(handle) = in_flight.pop_front() else { break };
        let resolved = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(ScanwerkError::Compose(format!("image task failed: {join_err}"))),
        };

        let placed = match resolved {
            Ok(bytes) => match place_blocking(compositor, bytes).await {
                Ok((returned, placed)) => {
                    compositor = returned;
                    placed
                }
                Err(err) => {
                    abort_all(&in_flight);
                    return Err(err);
                }
            },
            Err(err) => Err(err),
        };
        if let Err(err) = placed {
            abort_all(&in_flight);
            let err = match err {
                ScanwerkError::Compose(detail) => ScanwerkError::Compose(format!("page {}: {detail}", index + 1)),
                other => ScanwerkError::Compose(format!("page {}: {other}", index + 1)),
            };
            return Err(err);
        }

        debug!(page = index + 1, placed = compositor.page_count(), total, "page placed");
        if let Some(tx) = progress {
            tx.send_replace(ComposeProgress {
                placed: index + 1,
                total,
            });
        }
    }

    tokio::task::spawn_blocking(move || compositor.finish())
        .await
        .map_err(|err| ScanwerkError::Compose(format!("PDF serialisation task failed: {err}")))?
}

/// Run one `add_image` on the blocking pool, handing the compositor back.
///
/// The outer error means the task itself died and the compositor is lost.
async fn place_blocking(
    mut compositor: PdfCompositor,
    bytes: Arc<[u8]>,
) -> Result<(PdfCompositor, Result<Placement>)> {
    tokio::task::spawn_blocking(move || {
        let placed = compositor.add_image(&bytes);
        (compositor, placed)
    })
    .await
    .map_err(|err| ScanwerkError::Compose(format!("page placement task failed: {err}")))
}

fn abort_all(pending: &VecDeque<JoinHandle<Result<Arc<[u8]>>>>) {
    for handle in pending {
        handle.abort();
    }
}

/// Compose `pages` and write the PDF to `path`. Returns the byte count.
#[instrument(skip_all, fields(path = %path.as_ref().display(), pages = pages.len()))]
pub async fn export_to_file(
    pages: &[Page],
    options: &ComposeOptions,
    path: impl AsRef<Path>,
    progress: Option<&watch::Sender<ComposeProgress>>,
) -> Result<usize> {
    let bytes = compose_pages(pages, options, progress).await?;
    tokio::fs::write(path.as_ref(), &bytes).await?;
    info!(bytes = bytes.len(), "PDF written");
    Ok(bytes.len())
}
