use prometheus::Registry;
use prometheus_metric_storage::StorageRegistry;
use std::{collections::HashMap, sync::OnceLock};

static REGISTRY: OnceLock<StorageRegistry> = OnceLock::new();

/// Configures the global metrics registry with an optional prefix and set of
/// constant labels. Call once at startup before any metric is created;
/// metrics created earlier would land in a default unprefixed registry.
pub fn setup_registry(prefix: Option<String>, labels: Option<HashMap<String, String>>) {
    let registry = Registry::new_custom(prefix, labels).expect("invalid metrics registry config");
    REGISTRY
        .set(StorageRegistry::new(registry))
        .expect("metrics registry already initialized");
}

/// The global metric storage registry metric structs register themselves in.
pub fn get_storage_registry() -> &'static StorageRegistry {
    REGISTRY.get_or_init(|| {
        StorageRegistry::new(Registry::new_custom(None, None).expect("valid default registry"))
    })
}

/// The underlying prometheus registry, e.g. for text-format scraping.
pub fn get_registry() -> &'static Registry {
    get_storage_registry().registry()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_is_usable_without_setup() {
        let registry = get_storage_registry();
        let counter: prometheus::IntCounter = prometheus::IntCounter::new("test_counter", "help")
            .expect("valid metric");
        registry.registry().register(Box::new(counter.clone())).unwrap();
        counter.inc();
        assert_eq!(counter.get(), 1);
    }
}
