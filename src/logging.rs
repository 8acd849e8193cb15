// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Narrow logging capability used by the reconciliation engine.
//!
//! The engine only ever logs through [`DnsLogger`]. [`TracingLogger`] forwards
//! to `tracing` and tags every event with the cluster being reconciled.

use tracing::{debug, error, info, warn};

/// Severity of a [`DnsLogger`] event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Leveled logger with key/value fields.
pub trait DnsLogger: Send + Sync {
    /// Emit `message` at `level` with structured `fields`.
    fn log(&self, level: LogLevel, message: &str, fields: &[(&str, &str)]);

    fn debug(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(LogLevel::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(LogLevel::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(LogLevel::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(LogLevel::Error, message, fields);
    }
}

/// [`DnsLogger`] backed by `tracing`.
#[derive(Clone, Debug)]
pub struct TracingLogger {
    cluster: String,
}

impl TracingLogger {
    #[must_use]
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }
}

impl DnsLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[(&str, &str)]) {
        let f = EventFields::from_pairs(fields);
        let cluster = self.cluster.as_str();
        macro_rules! emit {
            ($event:ident) => {
                $event!(
                    cluster,
                    domain = f.domain,
                    zone_id = f.zone_id,
                    base_domain = f.base_domain,
                    base_zone_id = f.base_zone_id,
                    action = f.action,
                    changes = f.changes,
                    comment = f.comment,
                    reason = f.reason,
                    key = f.key,
                    error = f.error,
                    fields = f.extra.as_deref(),
                    "{}",
                    message
                )
            };
        }
        match level {
            LogLevel::Debug => emit!(debug),
            LogLevel::Info => emit!(info),
            LogLevel::Warn => emit!(warn),
            LogLevel::Error => emit!(error),
        }
    }
}

/// Engine log fields split into discrete `tracing` fields.
///
/// Keys the engine uses get their own field; anything else is rendered into
/// `extra`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventFields<'a> {
    pub domain: Option<&'a str>,
    pub zone_id: Option<&'a str>,
    pub base_domain: Option<&'a str>,
    pub base_zone_id: Option<&'a str>,
    pub action: Option<&'a str>,
    pub changes: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub key: Option<&'a str>,
    pub error: Option<&'a str>,
    pub extra: Option<String>,
}

impl<'a> EventFields<'a> {
    #[must_use]
    pub fn from_pairs(fields: &[(&'a str, &'a str)]) -> Self {
        let mut event = Self::default();
        let mut extra = Vec::new();
        for &(name, value) in fields {
            let slot = match name {
                "domain" => &mut event.domain,
                "zone_id" => &mut event.zone_id,
                "base_domain" => &mut event.base_domain,
                "base_zone_id" => &mut event.base_zone_id,
                "action" => &mut event.action,
                "changes" => &mut event.changes,
                "comment" => &mut event.comment,
                "reason" => &mut event.reason,
                "key" => &mut event.key,
                "error" => &mut event.error,
                _ => {
                    extra.push((name, value));
                    continue;
                }
            };
            *slot = Some(value);
        }
        if !extra.is_empty() {
            event.extra = Some(render_fields(&extra));
        }
        event
    }
}

/// Render fields as space separated `key=value` pairs.
#[must_use]
pub fn render_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
