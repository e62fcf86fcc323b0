//! Log events emitted by the registry
//!
//! Each configured level is routed to stdout (through `tracing`) or to
//! in-process listeners registered with [`EventEmitter::on`]. Levels that are
//! not configured are dropped.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Tracing target for stdout-routed events
pub const LOG_TARGET: &str = "asset_registry";
/// Tracing target for stdout-routed query events
pub const QUERY_TARGET: &str = "asset_registry::query";

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    /// One executed SQL statement
    Query,
    Warn,
    Error,
}

/// Where events of a level go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEmit {
    Stdout,
    Event,
}

/// One routing entry of the `log` configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogDefinition {
    pub level: LogLevel,
    #[serde(default = "default_emit")]
    pub emit: LogEmit,
}

impl LogDefinition {
    pub fn new(level: LogLevel, emit: LogEmit) -> Self {
        Self { level, emit }
    }
}

fn default_emit() -> LogEmit {
    LogEmit::Stdout
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LogLevel,
    /// Message, or the SQL text for query events
    pub message: String,
    /// Entity or component the event concerns
    pub target: Option<String>,
    /// Statement duration (query events only)
    pub duration: Option<Duration>,
    /// Whether the statement failed (query events only)
    pub failed: bool,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            target: None,
            duration: None,
            failed: false,
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Callback receiving events routed to `event`
pub type LogListener = Arc<dyn Fn(&LogEvent) + Send + Sync>;

/// Routes log events according to the configured definitions
pub struct EventEmitter {
    stdout: HashSet<LogLevel>,
    event: HashSet<LogLevel>,
    listeners: RwLock<Vec<(LogLevel, LogListener)>>,
}

impl EventEmitter {
    pub fn new(definitions: &[LogDefinition]) -> Self {
        let mut stdout = HashSet::new();
        let mut event = HashSet::new();
        for def in definitions {
            match def.emit {
                LogEmit::Stdout => stdout.insert(def.level),
                LogEmit::Event => event.insert(def.level),
            };
        }
        Self {
            stdout,
            event,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for one level
    pub fn on<F>(&self, level: LogLevel, listener: F)
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push((level, Arc::new(listener)));
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.stdout.contains(&level) || self.event.contains(&level)
    }

    pub fn emit(&self, event: LogEvent) {
        if self.stdout.contains(&event.level) {
            write_stdout(&event);
        }
        if self.event.contains(&event.level) {
            // Snapshot so listeners may register further listeners
            let listeners: Vec<LogListener> = self
                .listeners
                .read()
                .iter()
                .filter(|(level, _)| *level == event.level)
                .map(|(_, listener)| listener.clone())
                .collect();
            for listener in listeners {
                listener(&event);
            }
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        if self.is_enabled(LogLevel::Info) {
            self.emit(LogEvent::new(LogLevel::Info, message));
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        if self.is_enabled(LogLevel::Warn) {
            self.emit(LogEvent::new(LogLevel::Warn, message));
        }
    }

    pub fn error(&self, target: &str, message: impl Into<String>) {
        if self.is_enabled(LogLevel::Error) {
            self.emit(LogEvent::new(LogLevel::Error, message).with_target(target));
        }
    }

    pub fn query(&self, sql: &str, elapsed: Duration, failed: bool) {
        if self.is_enabled(LogLevel::Query) {
            let mut event = LogEvent::new(LogLevel::Query, sql);
            event.duration = Some(elapsed);
            event.failed = failed;
            self.emit(event);
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn write_stdout(event: &LogEvent) {
    let target = event.target.as_deref().unwrap_or("");
    match event.level {
        LogLevel::Info => tracing::info!(target: LOG_TARGET, entity = target, "{}", event.message),
        LogLevel::Warn => tracing::warn!(target: LOG_TARGET, entity = target, "{}", event.message),
        LogLevel::Error => {
            tracing::error!(target: LOG_TARGET, entity = target, "{}", event.message)
        }
        LogLevel::Query => tracing::info!(
            target: QUERY_TARGET,
            duration_ms = event.duration.map_or(0, |d| d.as_millis() as u64),
            failed = event.failed,
            "{}",
            event.message
        ),
    }
}
