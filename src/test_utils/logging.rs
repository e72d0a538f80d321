use std::fmt::{self, Write as _};
use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::{EnvFilter, Registry};

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness.
///
/// Honors `RUST_LOG`; defaults to `attic=debug` so a failing test shows the
/// transaction lifecycle that led to it.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("attic=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Run `f` on this thread and return the WARN events it emitted, each
/// rendered as `message=... field=...`.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let layer = WarningLayer::default();
    let seen = Arc::clone(&layer.seen);
    let subscriber = Registry::default().with(layer);
    let value = tracing::subscriber::with_default(subscriber, f);
    let warnings = seen.lock().clone();
    (value, warnings)
}

#[derive(Default)]
struct WarningLayer {
    seen: Arc<Mutex<Vec<String>>>,
}

impl<S: Subscriber> Layer<S> for WarningLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.seen.lock().push(fields.0);
    }
}

#[derive(Default)]
struct Fields(String);

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        let _ = write!(self.0, "{}={value:?}", field.name());
    }
}
