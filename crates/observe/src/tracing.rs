use {
    std::sync::Once,
    tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
};

/// Initializes the tracing setup shared between the binaries. `env_filter`
/// uses the `tracing_subscriber::EnvFilter` directive syntax, e.g.
/// `"warn,auctioneer=debug"`.
pub fn initialize(env_filter: &str) {
    set_subscriber(env_filter);
    std::panic::set_hook(Box::new(panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later
/// calls are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_subscriber(env_filter);
        std::panic::set_hook(Box::new(panic_hook));
    });
}

fn set_subscriber(env_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(env_filter))
        .with(fmt::layer().with_ansi(false))
        .init();
}

/// Panic messages go through tracing so they end up in the same sink as
/// regular logs.
fn panic_hook(info: &std::panic::PanicHookInfo) {
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread panicked: {info}\n{backtrace}");
}
