//! This module provides the structured diagnostics hooks for the routing core.
//!
//! `log_metric!` reports per-invocation routing decisions, such as the entry a
//! group resolved to. The body is compiled out unless `debug_assertions` is on.

/// Logs a structured key-value metric line through `log::debug!`, only in debug builds.
///
/// # Example
/// ```
/// use tambak_graph::log_metric;
/// let nb_tags = 4;
/// log_metric!("event"="dispatch", "nb_tags"=&nb_tags);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            log::debug!("TAMBAK_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
