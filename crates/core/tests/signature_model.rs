mod support;

use sigmaker_core::model::Signature;
use support::sig;

#[test]
fn trim_removes_only_the_trailing_wildcard_run() {
    let mut signature = sig(&[(0xAA, false), (0xBB, true), (0xCC, false), (0x00, true), (0x00, true)]);
    signature.trim();

    assert_eq!(signature.len(), 3);
    assert!(!signature.bytes()[2].wildcard, "new last byte must be fixed");
    // The interior wildcard survives.
    assert!(signature.bytes()[1].wildcard);
}

#[test]
fn trim_leaves_signature_without_trailing_wildcards_unchanged() {
    let mut signature = sig(&[(0xAA, true), (0xBB, false)]);
    let before = signature.clone();
    signature.trim();
    assert_eq!(signature, before);
}

#[test]
fn trim_of_all_wildcard_signature_empties_it() {
    let mut signature = sig(&[(0x11, true), (0x22, true)]);
    signature.trim();
    assert!(signature.is_empty());
}

#[test]
fn from_bytes_builds_all_fixed_signature() {
    let signature = Signature::from_bytes(&[0x90, 0x90, 0xC3]);
    assert_eq!(signature.len(), 3);
    assert_eq!(signature.wildcard_count(), 0);
    assert_eq!(signature.bytes()[2].value, 0xC3);
}

#[test]
fn wildcard_count_counts_every_wildcard_position() {
    let signature = sig(&[(0xAA, false), (0xBB, true), (0xCC, true), (0xDD, false)]);
    assert_eq!(signature.wildcard_count(), 2);
}
