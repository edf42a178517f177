//! Test-binary bootstrap shared across the workspace.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the tracing subscriber for a test binary. Idempotent, so every
/// test can call it without coordinating.
///
/// Honors `RUST_LOG` when set; defaults to `warn` so encoder fallback
/// warnings surface in test output without drowning it.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    // ctor runs at binary init so individual tests need no explicit call.
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}
