//! Property-based tests for metadata strings

use proptest::prelude::*;
use relaycast_metadata::{name_from_filename, normalize, TrackMetadata};
use std::path::Path;

proptest! {
    #[test]
    fn normalize_is_idempotent(s in "[ a-zA-Z\t]{0,40}") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
    }

    #[test]
    fn normalize_keeps_the_words(words in prop::collection::vec("[a-z]{1,6}", 0..8), gaps in prop::collection::vec(1usize..4, 8)) {
        let spaced: String = words
            .iter()
            .zip(&gaps)
            .map(|(w, n)| format!("{}{}", " ".repeat(*n), w))
            .collect();
        prop_assert_eq!(normalize(&spaced), words.join(" "));
    }

    #[test]
    fn strformat_without_markers_is_verbatim(template in "[^@]{0,40}") {
        let md = TrackMetadata::for_filename(Path::new("/x/y.ogg"));
        prop_assert_eq!(md.strformat(Some(template.as_str())).unwrap(), template);
    }

    #[test]
    fn display_name_is_never_empty(name in "[a-z.]{0,12}") {
        prop_assert!(!name_from_filename(Path::new(&name)).is_empty());
    }
}

#[test]
fn normalize_strings_twice_matches_once() {
    let mut md = TrackMetadata::for_filename(Path::new("a.ogg"));
    md.normalize_strings();
    let once = md.clone();
    md.normalize_strings();
    assert_eq!(md, once);
}
