//! Tests for the loaded-network registry

#[cfg(test)]
mod tests {
    use crate::common::{CountingLoader, FixedLocator, IntensitySegmenter};
    use jawseg::PipelineError;
    use jawseg::model::{
        CacheStats, Device, Locator, MissingBackend, ModelCache, ModelKey, ModelLoader, Segmenter,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loader() -> CountingLoader {
        CountingLoader::new(
            FixedLocator::new([1.0, 2.0, 3.0]),
            IntensitySegmenter::new([8, 8, 8]),
        )
    }

    /// Fails the first load of each kind, then defers to a working loader
    struct FlakyLoader {
        inner: CountingLoader,
        attempts: AtomicUsize,
    }

    impl ModelLoader for FlakyLoader {
        fn load_locator(&self, name: &str, device: Device) -> jawseg::Result<Arc<dyn Locator>> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return MissingBackend.load_locator(name, device);
            }
            (&self.inner).load_locator(name, device)
        }

        fn load_segmenter(
            &self,
            name: &str,
            device: Device,
        ) -> jawseg::Result<Arc<dyn Segmenter>> {
            (&self.inner).load_segmenter(name, device)
        }
    }

    // Tests repeated lookups return the same handle and load once
    // Verified by loading on every call
    #[test]
    fn test_same_key_loads_once() {
        let loader = loader();
        let cache = ModelCache::new(&loader);

        let first = cache.get_or_load_locator("jaw", Device::Cpu).expect("load");
        let second = cache.get_or_load_locator("jaw", Device::Cpu).expect("load");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.locator_loads(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    // Tests names and devices both distinguish handles
    #[test]
    fn test_key_includes_device_and_name() {
        let loader = loader();
        let cache = ModelCache::new(&loader);

        cache.get_or_load_segmenter("jaw", Device::Cpu).expect("load");
        cache.get_or_load_segmenter("jaw", Device::Cuda).expect("load");
        cache.get_or_load_segmenter("fin", Device::Cpu).expect("load");
        cache.get_or_load_segmenter("jaw", Device::Cpu).expect("load");

        assert_eq!(loader.segmenter_loads(), 3);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 3 });
    }

    // Tests locators and segmenters are cached separately under the same name
    #[test]
    fn test_kinds_are_cached_separately() {
        let loader = loader();
        let cache = ModelCache::new(&loader);

        cache.get_or_load_locator("jaw", Device::Cpu).expect("load");
        let segmenter = cache.get_or_load_segmenter("jaw", Device::Cpu).expect("load");

        assert_eq!(loader.locator_loads(), 1);
        assert_eq!(loader.segmenter_loads(), 1);
        assert_eq!(segmenter.config().patch_size, [8, 8, 8]);
    }

    // Tests a failed load is not remembered
    #[test]
    fn test_failed_load_is_retried() {
        let cache = ModelCache::new(FlakyLoader {
            inner: loader(),
            attempts: AtomicUsize::new(0),
        });

        assert!(matches!(
            cache.get_or_load_locator("jaw", Device::Cpu),
            Err(PipelineError::Model { .. })
        ));
        assert!(cache.get_or_load_locator("jaw", Device::Cpu).is_ok());
        assert_eq!(cache.loader().inner.locator_loads(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 1 });
    }

    // Tests key accessors
    #[test]
    fn test_model_key() {
        let key = ModelKey::new("jaw_locator", Device::Cuda);
        assert_eq!(key.name(), "jaw_locator");
        assert_eq!(key.device(), Device::Cuda);
        assert_ne!(key, ModelKey::new("jaw_locator", Device::Cpu));
    }
}
