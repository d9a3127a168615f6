//! Tests for device selection and the fallback loader

#[cfg(test)]
mod tests {
    use clap::ValueEnum;
    use jawseg::PipelineError;
    use jawseg::model::{Device, MissingBackend, ModelLoader};

    // Tests device names as shown and parsed on the command line
    #[test]
    fn test_device_names() {
        assert_eq!(Device::default(), Device::Cpu);
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda.to_string(), "cuda");
        assert_eq!(Device::from_str("cuda", true), Ok(Device::Cuda));
        assert!(Device::from_str("tpu", true).is_err());
    }

    // Tests the fallback loader names the model it could not load
    #[test]
    fn test_missing_backend_refuses_to_load() {
        match MissingBackend.load_segmenter("jaw_segmenter", Device::Cpu) {
            Err(PipelineError::Model { model, .. }) => assert_eq!(model, "jaw_segmenter"),
            Err(other) => unreachable!("expected a model error, got {other:?}"),
            Ok(_) => unreachable!("no backend is available"),
        }
        assert!(MissingBackend.load_locator("jaw_locator", Device::Cuda).is_err());
    }
}
