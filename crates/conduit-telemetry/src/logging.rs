//! Log line helpers with consistent fields.
//!
//! Every line carries `component` (the emitting crate or domain). Event
//! related lines also carry `topic`; cache related lines carry `key`.

/// Log with a `component` field.
///
/// ```rust,ignore
/// log_event!(info, "decision", "Intent generated", intent = %intent.name);
/// ```
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a bus event with `component` and `topic` fields.
#[macro_export]
macro_rules! log_topic_event {
    ($level:ident, $component:expr, $msg:expr, $topic:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            topic = %$topic,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a cache event with `component` and `key` fields.
#[macro_export]
macro_rules! log_cache_event {
    ($level:ident, $component:expr, $msg:expr, $key:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            key = %$key,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        // No subscriber installed: these only need to compile and not panic.
        log_event!(info, "test", "plain");
        log_event!(warn, "test", "with fields", attempt = 2, reason = "slow");
        log_topic_event!(debug, "test", "topic", "decision.intent.generated");
        log_cache_event!(info, "test", "cache", "cache://audio/0123456789ab", size = 10);
    }
}
