//! Property-based tests for catalogs and validators

use proptest::prelude::*;
use relaycast_config::validate::{duplicate, validate_int_range};
use relaycast_config::{Catalog, Entity, Intake, Stream};
use relaycast_core::Placeholder;

fn case_variants() -> impl Strategy<Value = (String, String)> {
    "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_flat_map(|name| {
        let len = name.len();
        (Just(name), proptest::collection::vec(any::<bool>(), len))
            .prop_map(|(name, flips)| {
                let other: String = name
                    .chars()
                    .zip(flips)
                    .map(|(c, flip)| {
                        if flip {
                            c.to_ascii_uppercase()
                        } else {
                            c.to_ascii_lowercase()
                        }
                    })
                    .collect();
                (name, other)
            })
    })
}

proptest! {
    #[test]
    fn get_or_create_ignores_case((name, variant) in case_variants()) {
        let mut intakes = Catalog::<Intake>::new();
        intakes.get_or_create(&name).unwrap().set_filename("/x").unwrap();
        let again = intakes.get_or_create(&variant).unwrap();

        prop_assert_eq!(again.filename(), Some("/x"));
        prop_assert_eq!(again.name(), name.as_str());
        prop_assert_eq!(intakes.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved(names in proptest::collection::hash_set("[a-z]{1,8}", 1..20)) {
        let names: Vec<String> = names.into_iter().collect();
        let mut streams = Catalog::<Stream>::new();
        for name in &names {
            streams.get_or_create(name).unwrap();
        }
        let listed: Vec<String> = streams.iter().map(|s| s.name().to_string()).collect();
        prop_assert_eq!(listed, names);
    }

    #[test]
    fn duplicate_matches_occurrence_count(prefix in "[a-z ]{0,8}", n in 0usize..5, sep in "[a-z ]{0,4}") {
        let template = format!("{}{}", prefix, vec!["@T@"; n].join(&sep));
        prop_assert_eq!(duplicate(&template, Placeholder::Track).is_err(), n > 1);
    }

    #[test]
    fn int_range_accepts_exactly_the_range(value in -1000i64..1000) {
        let accepted = validate_int_range(&value.to_string(), -10, 10).is_ok();
        prop_assert_eq!(accepted, (-10..=10).contains(&value));
    }
}
