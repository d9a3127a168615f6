//! Tests for segmentation training configuration

#[cfg(test)]
mod tests {
    use jawseg::PipelineError;
    use jawseg::math::probability::Activation;
    use jawseg::model::SegmenterConfig;
    use std::path::Path;

    // Tests a full configuration parses
    #[test]
    fn test_from_json() {
        let config =
            SegmenterConfig::from_json(r#"{"patch_size": [160, 160, 160], "activation": "softmax"}"#)
                .expect("config");

        assert_eq!(config.patch_size, [160, 160, 160]);
        assert_eq!(config.activation, Activation::Softmax);
    }

    // Tests the activation defaults to sigmoid when omitted
    #[test]
    fn test_activation_defaults_to_sigmoid() {
        let config = SegmenterConfig::from_json(r#"{"patch_size": [64, 96, 96]}"#).expect("config");
        assert_eq!(config.activation, Activation::Sigmoid);
    }

    // Tests zero patch extents are refused however they arrive
    #[test]
    fn test_zero_patch_extent_rejected() {
        assert!(matches!(
            SegmenterConfig::from_json(r#"{"patch_size": [64, 0, 64]}"#),
            Err(PipelineError::InvalidParameter { .. })
        ));
        assert!(SegmenterConfig::new([0, 1, 1], Activation::Identity).is_err());
    }

    // Tests malformed JSON is a configuration error
    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SegmenterConfig::from_json(r#"{"patch_size": [64, 64]}"#),
            Err(PipelineError::Configuration { .. })
        ));
        assert!(matches!(
            SegmenterConfig::from_json("not json"),
            Err(PipelineError::Configuration { .. })
        ));
    }

    // Tests reading the configuration file from disk
    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jaw.json");
        std::fs::write(&path, r#"{"patch_size": [8, 8, 8], "activation": "identity"}"#)
            .expect("write");

        let config = SegmenterConfig::from_json_file(&path).expect("config");
        assert_eq!(config.activation, Activation::Identity);

        assert!(matches!(
            SegmenterConfig::from_json_file(Path::new("/nonexistent/jaw.json")),
            Err(PipelineError::FileSystem { .. })
        ));
    }
}
