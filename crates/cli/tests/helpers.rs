use sigmaker::{load_image, parse_address};
use sigmaker_core::image::ImageBackend;
use tempfile::tempdir;

#[test]
fn parse_address_accepts_prefixed_and_bare_hex() {
    assert_eq!(parse_address("0x1A2B").unwrap(), 0x1A2B);
    assert_eq!(parse_address("0XFF").unwrap(), 0xFF);
    assert_eq!(parse_address("ff").unwrap(), 0xFF);
    assert_eq!(parse_address(" 0x10 ").unwrap(), 0x10);
}

#[test]
fn parse_address_rejects_garbage() {
    for input in ["", "0x", "xyz", "0x12G4"] {
        let err = parse_address(input).unwrap_err();
        assert!(err.to_string().contains("Invalid hex address"), "input {input:?}");
    }
}

#[test]
fn load_image_raw_places_bytes_at_the_requested_base() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, [0x90, 0xC3]).unwrap();

    let image = load_image(&path, true, 0x4000, None).unwrap();
    assert_eq!(image.min_address(), 0x4000);
    assert_eq!(image.max_address(), 0x4002);
    assert_eq!(image.read_byte(0x4001), 0xC3);
    assert_eq!(image.processor(), "x86_64");
}

#[test]
fn load_image_raw_honors_the_arch_hint() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, [0x00, 0x00, 0x00, 0x94]).unwrap();

    let image = load_image(&path, true, 0, Some("arm64")).unwrap();
    assert_eq!(image.processor(), "arm64");
}

#[test]
fn load_image_fails_for_missing_files() {
    let path = std::path::Path::new("/nonexistent/image.bin");
    assert!(load_image(path, true, 0, None).is_err());
    assert!(load_image(path, false, 0, None).is_err());
}
