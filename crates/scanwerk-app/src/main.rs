// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — desktop document scanner
//
// Entry point. Initialises logging and backend services, then launches the
// Dioxus UI.

mod pages;
mod services;

use dioxus::prelude::*;

use pages::scan::Scan;
use services::app_services::AppServices;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Scanwerk starting");

    dioxus::launch(app);
}

/// Root component.
fn app() -> Element {
    let svc = use_hook(|| match AppServices::init() {
        Ok(s) => {
            tracing::info!(backend = s.backend_name(), "backend services initialised");
            s
        }
        Err(e) => {
            tracing::error!(error = %e, "session storage unavailable, scanning disabled");
            AppServices::fallback()
        }
    });

    use_context_provider(|| svc.clone());

    rsx! {
        div { class: "app-container",
            style: "display: flex; flex-direction: column; height: 100vh; font-family: system-ui, -apple-system, sans-serif;",
            div { class: "page-content",
                style: "flex: 1; overflow-y: auto; padding: 16px;",
                Scan {}
            }
        }
    }
}
