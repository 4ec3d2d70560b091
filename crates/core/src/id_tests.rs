use super::*;

#[test]
fn same_path_yields_same_id() {
    let a = TaskId::for_path("/audio/a/clip.mp3");
    let b = TaskId::for_path("/audio/a/clip.mp3");
    assert_eq!(a, b);
}

#[test]
fn different_paths_yield_different_ids() {
    let a = TaskId::for_path("/audio/a/clip.mp3");
    let b = TaskId::for_path("/audio/b/clip.mp3");
    assert_ne!(a, b);
}

#[test]
fn matches_known_md5_digest() {
    // md5("/a/clip.mp3") precomputed.
    let id = TaskId::for_path("/a/clip.mp3");
    let expected = format!("{:x}", md5::compute(b"/a/clip.mp3"));
    assert_eq!(id.as_str(), expected);
    assert_eq!(id.as_str().len(), 32);
}

#[test]
fn from_hex_rejects_wrong_length() {
    assert!(TaskId::from_hex("deadbeef").is_none());
}

#[test]
fn from_hex_rejects_non_hex() {
    let bad = "g".repeat(32);
    assert!(TaskId::from_hex(&bad).is_none());
}

#[test]
fn from_hex_lowercases() {
    let hex = format!("{:X}", md5::compute(b"/a/clip.mp3"));
    let id = TaskId::from_hex(&hex).expect("valid hex");
    assert_eq!(id.as_str(), hex.to_lowercase());
}
