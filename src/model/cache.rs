use crate::io::error::{Result, model_error};
use crate::model::handle::{Device, Locator, ModelLoader, Segmenter};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Identity of a loaded network
///
/// The same name on two devices is two different handles.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ModelKey {
    name: String,
    device: Device,
}

impl ModelKey {
    /// Create a key from a model name and device
    pub fn new(name: &str, device: Device) -> Self {
        Self {
            name: name.to_string(),
            device,
        }
    }

    /// Model name as given when the network was trained
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device the network is loaded onto
    pub const fn device(&self) -> Device {
        self.device
    }
}

/// Performance metrics for cache effectiveness
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups answered from the cache
    pub hits: usize,
    /// Number of lookups that had to load a network
    pub misses: usize,
}

/// Registry of loaded networks, keyed by (name, device)
///
/// Lives for as long as the caller keeps it and never evicts. Each map is
/// locked for the whole of a load, so two requests for the same key never
/// both pay the loading cost.
pub struct ModelCache<L> {
    loader: L,
    locators: Mutex<HashMap<ModelKey, Arc<dyn Locator>>>,
    segmenters: Mutex<HashMap<ModelKey, Arc<dyn Segmenter>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<L: ModelLoader> ModelCache<L> {
    /// Create an empty cache around a loader
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            locators: Mutex::new(HashMap::new()),
            segmenters: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the cached localisation network or load it
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the cache lock is poisoned
    pub fn get_or_load_locator(&self, name: &str, device: Device) -> Result<Arc<dyn Locator>> {
        self.get_or_load(&self.locators, ModelKey::new(name, device), || {
            self.loader.load_locator(name, device)
        })
    }

    /// Return the cached segmentation network or load it
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the cache lock is poisoned
    pub fn get_or_load_segmenter(&self, name: &str, device: Device) -> Result<Arc<dyn Segmenter>> {
        self.get_or_load(&self.segmenters, ModelKey::new(name, device), || {
            self.loader.load_segmenter(name, device)
        })
    }

    /// Snapshot of hit and miss counts across both kinds of network
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Borrow the loader backing this cache
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    fn get_or_load<M, F>(
        &self,
        handles: &Mutex<HashMap<ModelKey, Arc<M>>>,
        key: ModelKey,
        load: F,
    ) -> Result<Arc<M>>
    where
        M: ?Sized,
        F: FnOnce() -> Result<Arc<M>>,
    {
        let mut handles = handles
            .lock()
            .map_err(|poisoned| model_error(key.name(), &poisoned))?;

        match handles.entry(key) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                log::debug!(
                    "Loading model '{}' on {}",
                    entry.key().name(),
                    entry.key().device()
                );
                let handle = load()?;
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::clone(entry.insert(handle)))
            }
        }
    }
}
