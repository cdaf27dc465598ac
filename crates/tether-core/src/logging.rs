//! Logging and debugging facilities for Tether.
//!
//! This module provides:
//! - The `tracing` targets used throughout the crate
//! - A textual dump of the object registry with signal link counts
//! - A performance span guard
//!
//! # Tracing Integration
//!
//! Tether uses the `tracing` crate for instrumentation. To see logs, install
//! a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tether_core::signal=trace,tether_core::dispatcher=warn")
//!     .init();
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::object::{ObjectSummary, global_registry};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target: connect, disconnect, emission.
    pub const SIGNAL: &str = "tether_core::signal";
    /// Object model target: registration and destruction.
    pub const OBJECT: &str = "tether_core::object";
    /// Cross-thread delivery target: mailbox draining and contained failures.
    pub const DISPATCHER: &str = "tether_core::dispatcher";
    /// Performance spans.
    pub const PERF: &str = "tether::perf";
}

/// Configuration for registry debug output.
#[derive(Debug, Clone)]
pub struct RegistryFormatOptions {
    /// Whether to show object IDs.
    pub show_ids: bool,
    /// Whether to show type names (without module path).
    pub show_types: bool,
    /// Whether to list destroyed entries still pinned by holds.
    pub show_destroyed: bool,
}

impl Default for RegistryFormatOptions {
    fn default() -> Self {
        Self {
            show_ids: true,
            show_types: true,
            show_destroyed: true,
        }
    }
}

/// Debug utility listing every registered object with its owning thread,
/// dispatch policy and signal links.
#[derive(Debug, Clone, Default)]
pub struct RegistryDebug {
    options: RegistryFormatOptions,
}

impl RegistryDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RegistryFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole global registry.
    pub fn format_all(&self) -> String {
        let mut entries = global_registry().with_read(|registry| registry.snapshot());
        entries.sort_by_key(|entry| entry.id.as_raw());
        self.format_entries(&entries)
    }

    fn format_entries(&self, entries: &[ObjectSummary]) -> String {
        let live = entries.iter().filter(|entry| !entry.destroyed).count();
        let mut output = String::new();
        let _ = writeln!(output, "Object Registry ({live} live objects):");

        let shown: Vec<_> = entries
            .iter()
            .filter(|entry| self.options.show_destroyed || !entry.destroyed)
            .collect();
        if shown.is_empty() {
            let _ = writeln!(output, "  (empty)");
        }
        for entry in shown {
            self.format_entry(entry, &mut output);
        }
        output
    }

    fn format_entry(&self, entry: &ObjectSummary, output: &mut String) {
        let name = if entry.name.is_empty() {
            "(unnamed)"
        } else {
            &entry.name
        };
        let _ = write!(output, "  {name}");
        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", entry.id);
        }
        if self.options.show_types {
            let short_type = entry.type_name.rsplit("::").next().unwrap_or(entry.type_name);
            let _ = write!(output, " ({short_type})");
        }
        let _ = write!(
            output,
            " thread={:?} policy={:?} incoming={} outgoing={} holds={}",
            entry.thread, entry.policy, entry.incoming_links, entry.outgoing_signals, entry.holds
        );
        if entry.destroyed {
            output.push_str(" destroyed");
        }
        output.push('\n');
    }
}

impl fmt::Display for RegistryDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_all())
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
