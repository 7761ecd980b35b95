//! Structured logging integration for events
//!
//! Mirrors every `AppEvent` into the tracing pipeline with its metadata, so
//! debug log files hold the full event history of a run.

use crikstats_events::{AppEvent, EventEnvelope};
use tracing::{debug, error, info, trace, warn, Level};

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let envelope = EventEnvelope::from(event.clone());
    let meta = &envelope.meta;
    let fields = envelope.event.log_fields();
    let target = envelope.event.log_target();

    macro_rules! emit {
        ($mac:ident) => {
            $mac!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                event_target = target,
                fields = %fields,
                "event"
            )
        };
    }

    match meta.tracing_level() {
        Level::ERROR => emit!(error),
        Level::WARN => emit!(warn),
        Level::INFO => emit!(info),
        Level::DEBUG => emit!(debug),
        _ => emit!(trace),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crikstats_events::{GeneralEvent, InstallEvent};
    use crikstats_types::ModuleId;

    #[test]
    fn test_logging_without_subscriber() {
        log_event_with_tracing(&AppEvent::General(GeneralEvent::warning("boom")));
        log_event_with_tracing(&AppEvent::Install(InstallEvent::Requested {
            module: ModuleId::from("feature_player"),
        }));
    }
}
