//! Backend registry with guarded lazy initialization.
//!
//! Backends can be expensive to construct, so they are loaded on first
//! request and cached. The whole check-then-load path runs under one mutex:
//! two concurrent first requests for the same backend get the same instance,
//! and the factory runs exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::summarize::SummaryBackend;

type BackendFactory = Box<dyn Fn() -> Result<Arc<dyn SummaryBackend>, String> + Send + Sync>;

pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
    loaded: Mutex<HashMap<&'static str, Arc<dyn SummaryBackend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Register a factory for a backend name. Registration happens at
    /// construction time, before any requests; nothing is loaded yet.
    pub fn register<F>(mut self, name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SummaryBackend>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name, Box::new(factory));
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Fetch a backend, loading it on first use. The lock is held across the
    /// factory call so a concurrent miss waits instead of double-loading.
    pub fn get_or_load(&self, name: &str) -> Result<Arc<dyn SummaryBackend>, String> {
        let mut loaded = self.loaded.lock();
        if let Some(backend) = loaded.get(name) {
            return Ok(Arc::clone(backend));
        }
        let (key, factory) = self
            .factories
            .get_key_value(name)
            .ok_or_else(|| format!("Unknown summarization mode: {}", name))?;
        log::info!("Loading summarization backend '{}'", name);
        let backend = factory()?;
        loaded.insert(*key, Arc::clone(&backend));
        Ok(backend)
    }

    /// Drop every loaded backend. Factories stay registered, so a later
    /// request reloads from scratch.
    pub fn shutdown(&self) {
        let mut loaded = self.loaded.lock();
        let count = loaded.len();
        loaded.clear();
        if count > 0 {
            log::info!("Unloaded {} summarization backend(s)", count);
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{RawSummary, MODE_EXTRACTIVE};
    use crate::types::SummaryText;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend;

    impl SummaryBackend for CountingBackend {
        fn name(&self) -> &'static str {
            MODE_EXTRACTIVE
        }
        fn summarize(&self, _chunks: &[String]) -> Result<RawSummary, String> {
            Ok(RawSummary {
                summary: SummaryText::Text(String::new()),
                items: vec![],
            })
        }
    }

    #[test]
    fn test_factory_runs_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = BackendRegistry::new().register(MODE_EXTRACTIVE, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingBackend) as Arc<dyn SummaryBackend>)
        });

        let a = registry.get_or_load(MODE_EXTRACTIVE).unwrap();
        let b = registry.get_or_load(MODE_EXTRACTIVE).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = Arc::new(BackendRegistry::new().register(MODE_EXTRACTIVE, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(CountingBackend) as Arc<dyn SummaryBackend>)
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_load(MODE_EXTRACTIVE).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let registry = BackendRegistry::new();
        let error = registry.get_or_load("abstractive").unwrap_err();
        assert!(error.contains("abstractive"));
    }

    #[test]
    fn test_shutdown_then_reload() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = BackendRegistry::new().register(MODE_EXTRACTIVE, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingBackend) as Arc<dyn SummaryBackend>)
        });

        registry.get_or_load(MODE_EXTRACTIVE).unwrap();
        registry.shutdown();
        registry.get_or_load(MODE_EXTRACTIVE).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
