use {
    prometheus::Encoder,
    std::{collections::HashMap, net::SocketAddr, sync::OnceLock},
    tokio::task::JoinHandle,
};

/// Global metrics registry used by all components.
static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();

/// Configures the global metrics registry with an optional common prefix
/// and labels. Call once, at the very beginning of `main`, before any
/// metric is touched.
///
/// # Panics
///
/// Panics when called twice or after a call to [`get_storage_registry`].
pub fn setup_registry(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels).unwrap();
    let storage = prometheus_metric_storage::StorageRegistry::new(registry);
    REGISTRY.set(storage).unwrap();
}

/// Like [`setup_registry`], but can be called multiple times in a row.
/// Later calls are ignored.
///
/// Useful for tests.
pub fn setup_registry_reentrant(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = prometheus::Registry::new_custom(prefix, labels).unwrap();
    let storage = prometheus_metric_storage::StorageRegistry::new(registry);
    REGISTRY.set(storage).ok();
}

/// Gets the global metric storage registry, initializing it with defaults
/// when [`setup_registry`] was never called (convenient for unit tests).
pub fn get_storage_registry() -> &'static prometheus_metric_storage::StorageRegistry {
    REGISTRY.get_or_init(prometheus_metric_storage::StorageRegistry::default)
}

pub fn get_registry() -> &'static prometheus::Registry {
    get_storage_registry().registry()
}

pub fn encode(registry: &prometheus::Registry) -> String {
    let mut buffer = Vec::new();
    prometheus::TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Spawns the HTTP server exposing the registry under `/metrics`.
pub fn serve(address: SocketAddr) -> JoinHandle<()> {
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(|| async { encode(get_registry()) }),
    );
    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(address)
            .await
            .unwrap_or_else(|err| panic!("failed to bind metrics server on {address}: {err}"));
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(?err, "metrics server terminated");
        }
    })
}
