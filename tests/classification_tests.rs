//! End-to-end classification through the public library API.

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;

use mime_sleuth::detector::{Detector, DetectorError, ExtensionDetector, MagicDetector};
use mime_sleuth::{MimeSleuth, MimeType, MimeTypeSet, SleuthConfig};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

fn sleuth() -> MimeSleuth {
    MimeSleuth::new().expect("default detectors")
}

#[test]
fn test_png_prefix_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, b"\x89P").unwrap();

    let result = sleuth().classify_path(&path);
    let png = result.get(&"image/png".parse().unwrap()).unwrap();
    assert!(png.mime_type.specificity() >= 1);
}

#[test]
fn test_empty_png_named_file_uses_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.png");
    std::fs::File::create(&path).unwrap();

    let by_path = sleuth().classify_path(&path);
    assert!(by_path.contains_str("image/png"));
    assert!(!by_path.contains_str("application/octet-stream"));
}

#[test]
fn test_full_signature_outranks_extension_guess() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("really-a-png.gif");
    std::fs::write(&path, PNG_SIGNATURE).unwrap();

    let result = sleuth().classify_path(&path);
    assert!(result.contains_str("image/png,image/gif"));
    assert_eq!(result.most_specific().unwrap(), "image/png");
}

#[test]
fn test_file_handle_position_restored() {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(b"junk%PDF-1.4\n").unwrap();
    file.seek(SeekFrom::Start(4)).unwrap();

    let result = sleuth().classify_file(&mut file);
    assert!(result.contains_str("application/pdf"));
    assert_eq!(file.stream_position().unwrap(), 4);
}

#[test]
fn test_stream_position_restored_on_no_match() {
    let mut stream = Cursor::new(vec![0xFFu8, 0x00, 0x13, 0x37, 0x00, 0x01]);
    stream.seek(SeekFrom::Start(1)).unwrap();

    let result = sleuth().classify_stream(&mut stream);
    assert_eq!(result, "application/octet-stream");
    assert_eq!(stream.position(), 1);
}

#[test]
fn test_zero_length_buffer_is_empty_not_unknown() {
    let result = sleuth().classify_bytes(b"");
    assert!(result.contains_str("application/x-empty"));
    assert!(!result.contains_str("application/octet-stream"));
}

#[test]
fn test_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(sleuth()
        .classify_path(dir.path())
        .contains_str("application/directory"));
}

#[test]
fn test_configured_unknown_type() {
    let config = SleuthConfig {
        unknown_mime_type: "application/x-unidentified".to_string(),
        detectors: Some(vec!["magic".to_string()]),
        ..SleuthConfig::default()
    };
    let sleuth = MimeSleuth::with_config(&config).unwrap();
    assert_eq!(sleuth.classify_name("a.png"), "application/x-unidentified");
}

#[test]
fn test_extra_rule_file() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("extra.magic");
    std::fs::write(
        &rules,
        "# custom format\n0\tstring\tSLTH\tapplication/x-sleuth\n>4\tbyte\t2\tapplication/x-sleuth-v2\n",
    )
    .unwrap();

    let config = SleuthConfig {
        magic_files: vec![rules],
        ..SleuthConfig::default()
    };
    let sleuth = MimeSleuth::with_config(&config).unwrap();

    let v1 = sleuth.classify_bytes(b"SLTH\x01\0");
    assert!(v1.contains_str("application/x-sleuth"));

    let v2 = sleuth.classify_bytes(b"SLTH\x02\0");
    assert_eq!(v2.most_specific().unwrap(), "application/x-sleuth-v2");
    assert_eq!(v2.most_specific().unwrap().specificity(), 2);
}

#[test]
fn test_agreeing_detectors_accumulate() {
    let config = SleuthConfig {
        detectors: Some(
            ["magic", "extension", "text"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        ),
        ..SleuthConfig::default()
    };
    let sleuth = MimeSleuth::with_config(&config).unwrap();
    let result = sleuth.classify_upload(Some("notes.txt"), b"just some words\n");
    let text = result.get(&"text/plain".parse().unwrap()).unwrap();
    assert_eq!(text.encoding.as_deref(), Some("US-ASCII"));
    // Magic text fallback, extension and text detector all agree
    assert_eq!(text.mime_type.specificity(), 3);
}

/// Detector that always fails, to check failures are contained
struct Broken;

impl Detector for Broken {
    fn description(&self) -> &str {
        "always fails"
    }

    fn classify_bytes(&self, _data: &[u8]) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::ClassificationFailure("boom".to_string()))
    }
}

#[test]
fn test_failing_detector_contributes_nothing() {
    let sleuth = sleuth();
    sleuth.register_detector(Arc::new(Broken));
    let result = sleuth.classify_bytes(b"GIF87a");
    assert!(result.contains_str("image/gif"));
}

#[test]
fn test_register_same_name_twice() {
    let sleuth = MimeSleuth::bare(MimeType::new("application", "octet-stream").unwrap());
    let first = sleuth.register_detector(Arc::new(ExtensionDetector::default()));
    let second = sleuth.register_detector(Arc::new(ExtensionDetector::default()));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(sleuth.detectors().len(), 1);

    sleuth.register_detector(Arc::new(MagicDetector::embedded()));
    assert_eq!(sleuth.detectors().len(), 2);
}

#[test]
fn test_concurrent_classification() {
    let sleuth = Arc::new(sleuth());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sleuth = Arc::clone(&sleuth);
            std::thread::spawn(move || {
                if i % 2 == 0 {
                    sleuth.classify_bytes(PNG_SIGNATURE)
                } else {
                    sleuth.classify_bytes(b"%PDF-1.7")
                }
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap();
        let expected = if i % 2 == 0 { "image/png" } else { "application/pdf" };
        assert!(result.contains_str(expected));
    }
}
