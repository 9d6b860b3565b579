//! Property-based tests for the naming functions that generated Go code
//! depends on.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::module::gomod::{escape_path, unescape_path};
    use crate::module::ModulePath;
    use crate::phases::dispatch::{build_dispatch, is_identifier, sanitize_alias};
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    // ============================================================================
    // sanitize_alias property tests
    // ============================================================================

    proptest! {
        /// Property: any command name yields a usable identifier
        #[test]
        fn sanitize_alias_always_yields_identifier(input in ".*") {
            let alias = sanitize_alias(&input);
            prop_assert!(is_identifier(&alias), "{:?} -> {:?}", input, alias);
        }

        /// Property: plain lower-case names are kept as they are
        #[test]
        fn sanitize_alias_keeps_plain_names(input in "x[a-z0-9_]{0,12}") {
            prop_assert_eq!(sanitize_alias(&input), input);
        }

        /// Property: sanitize_alias is idempotent
        #[test]
        fn sanitize_alias_is_idempotent(input in ".*") {
            let once = sanitize_alias(&input);
            prop_assert_eq!(sanitize_alias(&once), once);
        }
    }

    // ============================================================================
    // build_dispatch property tests
    // ============================================================================

    proptest! {
        /// Property: every package gets a distinct identifier as its alias,
        /// and every command refers to one of them
        #[test]
        fn dispatch_aliases_are_distinct(names in prop::collection::btree_set(".{1,8}", 1..12)) {
            let commands: BTreeMap<String, String> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), format!("example.com/gen/internal/p{}", i)))
                .collect();

            let table = build_dispatch("main", &commands).unwrap();

            let aliases: BTreeSet<&str> = table.imports.iter().map(|i| i.alias.as_str()).collect();
            prop_assert_eq!(aliases.len(), commands.len());
            for alias in &aliases {
                prop_assert!(is_identifier(alias));
            }
            for entry in &table.entries {
                prop_assert!(aliases.contains(entry.alias.as_str()));
            }
        }

        /// Property: commands sharing a package share one import
        #[test]
        fn dispatch_imports_each_package_once(
            names in prop::collection::btree_set("[a-z]{1,6}", 1..10),
            packages in 1usize..4,
        ) {
            let commands: BTreeMap<String, String> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), format!("example.com/p{}", i % packages)))
                .collect();
            let distinct: BTreeSet<&String> = commands.values().collect();

            let table = build_dispatch("programs", &commands).unwrap();

            prop_assert_eq!(table.imports.len(), distinct.len());
            prop_assert_eq!(table.entries.len(), commands.len());
        }
    }

    // ============================================================================
    // Module path property tests
    // ============================================================================

    proptest! {
        /// Property: unescape_path inverts escape_path
        #[test]
        fn escape_path_round_trips(input in "[a-zA-Z0-9._~/-]{0,40}") {
            let escaped = escape_path(&input);
            prop_assert!(!escaped.chars().any(|c| c.is_ascii_uppercase()));
            prop_assert_eq!(unescape_path(&escaped), input);
        }

        /// Property: a module owns its sub-packages but not siblings that
        /// merely share a name prefix
        #[test]
        fn module_prefix_respects_path_boundaries(
            module in "[a-z]{1,8}\\.com/[a-z]{1,8}",
            rest in "[a-z0-9]{1,8}",
        ) {
            let path = ModulePath::new(module.clone());
            prop_assert!(path.is_prefix_of(&module));
            let sub_package = format!("{}/{}", module, rest);
            let sibling = format!("{}{}", module, rest);
            prop_assert!(path.is_prefix_of(&sub_package));
            prop_assert!(!path.is_prefix_of(&sibling));
        }
    }
}
