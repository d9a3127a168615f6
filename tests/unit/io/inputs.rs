//! Tests for resolving input descriptors into a stream of volumes

#[cfg(test)]
mod tests {
    use crate::common::cube_volume;
    use image::GrayImage;
    use jawseg::PipelineError;
    use jawseg::io::inputs::{InferenceInputs, expand_home, is_manifest, manifest_entries};
    use jawseg::io::volume_file::write_volume;
    use std::path::{Path, PathBuf};

    fn write_scan(path: &Path) {
        write_volume(path, &cube_volume(8, 2, 4, 0, 100)).expect("write scan");
    }

    fn write_slices(dir: &Path, count: usize) {
        std::fs::create_dir_all(dir).expect("mkdir");
        for i in 0..count {
            let slice = GrayImage::from_pixel(6, 4, image::Luma([i as u8]));
            slice
                .save(dir.join(format!("slice_{i:03}.tif")))
                .expect("write slice");
        }
    }

    fn identifiers(inputs: InferenceInputs) -> Vec<PathBuf> {
        inputs
            .map(|item| item.expect("item").identifier)
            .collect()
    }

    // Tests comments and blank lines in a manifest are skipped
    // Verified by treating comment lines as paths
    #[test]
    fn test_manifest_skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first.tif");
        let second = dir.path().join("second.tif");
        write_scan(&first);
        write_scan(&second);

        let manifest = dir.path().join("batch.txt");
        let text = format!(
            "#comment\n\n{}\n   \n{}\n",
            first.display(),
            second.display()
        );
        std::fs::write(&manifest, text).expect("write manifest");

        let items: Vec<_> = InferenceInputs::new(&manifest, false)
            .expect("inputs")
            .collect::<Result<_, _>>()
            .expect("items");

        assert_eq!(items.len(), 2);
        assert_eq!(items.first().map(|i| &i.identifier), Some(&first));
        assert_eq!(items.last().map(|i| i.volume.shape()), Some([8, 8, 8]));
    }

    // Tests a missing top-level descriptor is refused immediately
    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = InferenceInputs::new(&dir.path().join("nope.tif"), false);
        assert!(matches!(result, Err(PipelineError::InputNotFound { .. })));
    }

    // Tests a missing manifest entry ends the stream at that entry
    #[test]
    fn test_missing_manifest_entry_ends_stream() {
        let dir = tempfile::tempdir().expect("tempdir");
        let present = dir.path().join("present.tif");
        let later = dir.path().join("later.tif");
        write_scan(&present);
        write_scan(&later);

        let manifest = dir.path().join("batch.txt");
        let missing = dir.path().join("missing.tif");
        std::fs::write(
            &manifest,
            format!(
                "{}\n{}\n{}\n",
                present.display(),
                missing.display(),
                later.display()
            ),
        )
        .expect("write manifest");

        let mut inputs = InferenceInputs::new(&manifest, false).expect("inputs");
        assert!(inputs.next().is_some_and(|item| item.is_ok()));
        assert!(matches!(
            inputs.next(),
            Some(Err(PipelineError::InputNotFound { path })) if path == missing
        ));
        assert!(inputs.next().is_none());
    }

    // Tests a directory of volumes yields one item per file in name order
    #[test]
    fn test_volume_directory_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["c.tif", "a.tif", "b.tif"] {
            write_scan(&dir.path().join(name));
        }
        std::fs::write(dir.path().join("notes.md"), "ignored").expect("write");

        let found = identifiers(InferenceInputs::new(dir.path(), false).expect("inputs"));
        assert_eq!(
            found,
            vec![
                dir.path().join("a.tif"),
                dir.path().join("b.tif"),
                dir.path().join("c.tif"),
            ]
        );
    }

    // Tests a directory with no volume files is an error
    #[test]
    fn test_empty_volume_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut inputs = InferenceInputs::new(dir.path(), false).expect("inputs");
        assert!(matches!(
            inputs.next(),
            Some(Err(PipelineError::NoVolumeFiles { .. }))
        ));
    }

    // Tests a regular file with slice stacking requested is a kind mismatch
    #[test]
    fn test_file_with_slice_flag_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scan = dir.path().join("scan.tif");
        write_scan(&scan);

        let mut inputs = InferenceInputs::new(&scan, true).expect("inputs");
        assert!(inputs.two_d_images());
        assert!(matches!(
            inputs.next(),
            Some(Err(PipelineError::SliceFlagWithFile { .. }))
        ));
    }

    // Tests a manifest of slice directories yields one stacked volume each
    #[test]
    fn test_manifest_of_slice_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("fish_a");
        let second = dir.path().join("fish_b");
        write_slices(&first, 5);
        write_slices(&second, 3);

        let manifest = dir.path().join("slices.txt");
        std::fs::write(
            &manifest,
            format!("{}\n{}\n", first.display(), second.display()),
        )
        .expect("write manifest");

        let shapes: Vec<_> = InferenceInputs::new(&manifest, true)
            .expect("inputs")
            .map(|item| item.expect("item").volume.shape())
            .collect();
        assert_eq!(shapes, vec![[5, 4, 6], [3, 4, 6]]);
    }

    // Tests manifest detection and line parsing
    #[test]
    fn test_manifest_entries_and_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("list.TXT");
        std::fs::write(&manifest, "  relative/scan.tif  \n# skipped\n\n/abs/scan.dcm\n")
            .expect("write manifest");

        assert!(is_manifest(&manifest));
        assert!(!is_manifest(Path::new("scan.tif")));
        assert_eq!(
            manifest_entries(&manifest).expect("entries"),
            vec![PathBuf::from("relative/scan.tif"), PathBuf::from("/abs/scan.dcm")]
        );
    }

    // Tests only lines starting with the comment marker are comments
    // Verified by trimming before checking for the marker
    #[test]
    fn test_indented_hash_is_a_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("list.txt");
        std::fs::write(&manifest, "#comment\n   \n  #scan.tif\n\t\n").expect("write manifest");

        assert_eq!(
            manifest_entries(&manifest).expect("entries"),
            vec![PathBuf::from("#scan.tif")]
        );
    }

    // Tests a leading tilde expands to the home directory
    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/data/scan.tif"), PathBuf::from("/data/scan.tif"));
        assert_eq!(expand_home("~user/scan.tif"), PathBuf::from("~user/scan.tif"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/scans/a.tif"), home.join("scans/a.tif"));
        }
    }
}
