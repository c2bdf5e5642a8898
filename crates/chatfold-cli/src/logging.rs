// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CHATFOLD_LOG";

/// Sends log lines to `file`; the terminal UI owns stdout.
pub fn init(file: &Path, level: &str) -> Result<()> {
    let filter = resolve_filter(std::env::var(LOG_ENV).ok().as_deref(), level)?;

    if let Some(parent) = file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let sink = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                file.display()
            )
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(sink))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

fn resolve_filter(from_env: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directives = from_env
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directives).with_context(|| {
        format!("invalid log filter {directives:?}; set [log].level or {LOG_ENV} to e.g. \"debug\"")
    })
}
