use std::fs;
use std::path::Path;

use assert_matches::assert_matches;

use pokemeta::error::MetaError;
use pokemeta::verify::check_alignment;

fn touch(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"{}").unwrap();
    }
}

#[test]
fn matching_folders_are_aligned() {
    let temp = tempfile::tempdir().unwrap();
    let images = temp.path().join("byNumber");
    let metadata = temp.path().join("metadata");
    touch(&images, &["1.png", "2.jpg", "3.png", "cover.png"]);
    touch(&metadata, &["1.json", "2.json", "3.json"]);

    let report = check_alignment(&images, &metadata).unwrap();

    assert!(report.aligned);
    assert_eq!(report.images, 3);
    assert_eq!(report.metadata, 3);
    assert!(report.into_result().is_ok());
}

#[test]
fn reports_both_sides_and_duplicates() {
    let temp = tempfile::tempdir().unwrap();
    let images = temp.path().join("byNumber");
    let metadata = temp.path().join("metadata");
    touch(&images, &["1.png", "1.jpg", "2.png", "4.png"]);
    touch(&metadata, &["1.json", "2.json", "3.json"]);

    let report = check_alignment(&images, &metadata).unwrap();

    assert!(!report.aligned);
    assert_eq!(report.missing_metadata, vec![4]);
    assert_eq!(report.missing_images, vec![3]);
    assert_eq!(report.duplicate_images, vec![1]);
    assert_matches!(
        report.into_result(),
        Err(MetaError::Misaligned {
            missing_metadata: 1,
            missing_images: 1,
            duplicates: 1
        })
    );
}

#[test]
fn missing_metadata_folder_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let images = temp.path().join("byNumber");
    touch(&images, &["1.png"]);
    let err = check_alignment(&images, &temp.path().join("absent")).unwrap_err();
    assert_matches!(err, MetaError::MissingSourceDir(_));
}
