//! Structured logging helpers.
//!
//! All records go through the `log` facade under one target so that
//! applications can filter substrate events with a single directive.

/// Logging target for every record emitted by this crate.
pub(crate) const LOG_TARGET: &str = "trie_substrate";

/// Emit `event=<name> <formatted fields>` at the given level.
macro_rules! substrate_log {
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: $crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: $crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use substrate_log;
