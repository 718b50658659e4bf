use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::detector::Detector;

/// Detectors keyed by name, iterated in name order
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: RwLock<BTreeMap<String, Arc<dyn Detector>>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detector under its name.
    ///
    /// If a detector with the same name is already registered, the registry is
    /// left unchanged and the existing instance is returned.
    pub fn register(&self, detector: Arc<dyn Detector>) -> Arc<dyn Detector> {
        let name = detector.name().to_string();
        let mut detectors = self.detectors.write();
        if let Some(existing) = detectors.get(&name) {
            error!(detector = %name, "Detector already registered");
            return Arc::clone(existing);
        }
        debug!(detector = %name, "Registered detector");
        detectors.insert(name, Arc::clone(&detector));
        detector
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Detector>> {
        let removed = self.detectors.write().remove(name);
        if removed.is_some() {
            debug!(detector = %name, "Unregistered detector");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.detectors.read().keys().cloned().collect()
    }

    /// Current detectors in name order. The lock is released before returning so
    /// classification never holds it while doing I/O.
    pub fn snapshot(&self) -> Vec<Arc<dyn Detector>> {
        self.detectors.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.read().is_empty()
    }
}
