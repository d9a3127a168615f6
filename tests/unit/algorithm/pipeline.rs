//! Tests for the batch driver: output naming, collision checks and skipping

#[cfg(test)]
mod tests {
    use crate::common::{FixedLocator, IntensitySegmenter, cube_volume};
    use jawseg::PipelineError;
    use jawseg::algorithm::localisation::LocalisationParams;
    use jawseg::algorithm::pipeline::{ItemOutcome, OutputPaths, Pipeline, PipelineConfig};
    use jawseg::algorithm::postprocess::PostProcessing;
    use jawseg::algorithm::segmentation::InferenceParams;
    use jawseg::io::inputs::InputItem;
    use jawseg::io::progress::ProgressReporter;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn config(output_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            localisation: LocalisationParams::new([32, 32, 32], [16, 16, 16]).expect("params"),
            inference: InferenceParams::default(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn pipeline(
        output_dir: &Path,
        centre: [f64; 3],
    ) -> (Pipeline, Arc<FixedLocator>, Arc<IntensitySegmenter>) {
        let locator = Arc::new(FixedLocator::new(centre));
        let segmenter = Arc::new(IntensitySegmenter::new([8, 8, 8]));
        let pipeline = Pipeline::new(locator.clone(), segmenter.clone(), config(output_dir))
            .expect("pipeline");
        (pipeline, locator, segmenter)
    }

    fn item(name: &str, side: usize) -> InputItem {
        InputItem {
            identifier: PathBuf::from("/data/scans").join(name),
            volume: cube_volume(side, side / 4, side / 2, 0, 255),
        }
    }

    // Tests output names replace the extension and land in imgs/ and masks/
    #[test]
    fn test_output_paths_from_base_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, _, _) = pipeline(dir.path(), [16.0; 3]);

        let paths = pipeline.output_paths(Path::new("/data/scans/fish_001.dcm"));
        assert_eq!(paths.image, dir.path().join("imgs").join("fish_001.tif"));
        assert_eq!(paths.mask, dir.path().join("masks").join("fish_001.tif"));

        let paths = pipeline.output_paths(Path::new("/data/slices/fish_002"));
        assert_eq!(paths.mask, dir.path().join("masks").join("fish_002.tif"));
    }

    // Tests construction creates both output directories
    #[test]
    fn test_new_creates_output_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("nested").join("out");
        let _ = pipeline(&root, [16.0; 3]);

        assert!(root.join("imgs").is_dir());
        assert!(root.join("masks").is_dir());
    }

    // Tests an inconsistent configuration is refused before anything is created
    #[test]
    fn test_invalid_configuration_rejected_up_front() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("out");
        let mut bad = config(&root);
        bad.inference.postprocessing = PostProcessing {
            threshold: None,
            ..PostProcessing::default()
        };

        let result = Pipeline::new(
            Arc::new(FixedLocator::new([0.0; 3])),
            Arc::new(IntensitySegmenter::new([8, 8, 8])),
            bad,
        );

        assert!(matches!(result, Err(PipelineError::Configuration { .. })));
        assert!(!root.exists());
    }

    // Tests an existing output aborts the item before any network is called
    // Verified by checking outputs after cropping
    #[test]
    fn test_existing_output_refused_before_inference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, locator, segmenter) = pipeline(dir.path(), [16.0; 3]);
        let existing = dir.path().join("masks").join("fish_001.tif");
        std::fs::write(&existing, b"old result").expect("write");

        let result = pipeline.process_item(&item("fish_001.tif", 32));

        match result {
            Err(PipelineError::OutputExists { path }) => assert_eq!(path, existing),
            other => unreachable!("expected OutputExists, got {other:?}"),
        }
        assert_eq!(locator.calls(), 0);
        assert_eq!(segmenter.calls(), 0);
        assert_eq!(std::fs::read(&existing).expect("read"), b"old result");
    }

    // Tests a successful item writes both outputs
    #[test]
    fn test_process_item_writes_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, _, segmenter) = pipeline(dir.path(), [16.0; 3]);

        let outcome = pipeline.process_item(&item("fish_001.tif", 32)).expect("process");

        let ItemOutcome::Saved(OutputPaths { image, mask }) = outcome else {
            unreachable!("expected outputs to be written");
        };
        assert!(image.is_file());
        assert!(mask.is_file());
        assert!(segmenter.calls() > 0);
    }

    // Tests a failed mask write leaves no image behind so the item can be rerun
    #[test]
    fn test_failed_mask_write_removes_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, _, _) = pipeline(dir.path(), [16.0; 3]);
        let masks = dir.path().join("masks");
        std::fs::remove_dir(&masks).expect("remove mask directory");

        let result = pipeline.process_item(&item("fish_001.tif", 32));

        assert!(matches!(result, Err(PipelineError::FileSystem { .. })));
        assert!(!dir.path().join("imgs").join("fish_001.tif").exists());

        std::fs::create_dir(&masks).expect("restore mask directory");
        let outcome = pipeline.process_item(&item("fish_001.tif", 32)).expect("rerun");
        assert!(matches!(outcome, ItemOutcome::Saved(_)));
    }

    // Tests an out-of-bounds crop skips the item and the run carries on
    // Verified by propagating the crop failure as an error
    #[test]
    fn test_out_of_bounds_item_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, locator, _) = pipeline(dir.path(), [16.0; 3]);
        let pipeline = pipeline.with_progress(ProgressReporter::new());

        let inputs = vec![Ok(item("small.tif", 12)), Ok(item("large.tif", 32))];
        let summary = pipeline.run(inputs).expect("run");

        assert_eq!(summary.processed, vec![PathBuf::from("/data/scans/large.tif")]);
        assert_eq!(summary.skipped.len(), 1);
        let skipped = summary.skipped.first().expect("skipped item");
        assert_eq!(skipped.identifier, PathBuf::from("/data/scans/small.tif"));
        assert_eq!(skipped.reason.axis, 0);
        assert_eq!(skipped.reason.available, 12);

        assert!(!dir.path().join("imgs").join("small.tif").exists());
        assert!(!dir.path().join("masks").join("small.tif").exists());
        assert!(dir.path().join("masks").join("large.tif").exists());
        assert_eq!(locator.calls(), 2);
    }

    // Tests any other error ends the run
    #[test]
    fn test_input_error_ends_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (pipeline, locator, _) = pipeline(dir.path(), [16.0; 3]);

        let inputs = vec![
            Err(PipelineError::InputNotFound {
                path: PathBuf::from("missing.tif"),
            }),
            Ok(item("large.tif", 32)),
        ];

        assert!(matches!(
            pipeline.run(inputs),
            Err(PipelineError::InputNotFound { .. })
        ));
        assert_eq!(locator.calls(), 0);
    }
}
