// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

/// Sends tracing output to `path`, appending. `RUST_LOG` overrides `level`.
pub fn start_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {}; fix [log].path or remove it to disable logging",
                path.display()
            )
        })?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());
    let subscriber = Registry::default().with(
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(filter),
    );

    set_global_default(subscriber).context("install tracing subscriber")?;
    Ok(())
}
