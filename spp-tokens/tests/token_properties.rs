use proptest::prelude::*;
use spp_tokens::{TokenEntry, TokenMeta, decode, encode, verify};

fn arb_entry() -> impl Strategy<Value = TokenEntry> {
    (
        "[A-Za-z0-9_]{1,20}",
        prop::sample::select(vec!["xml", "dat", "bin"]),
        prop::collection::vec(any::<u8>(), 0..200),
        any::<bool>(),
    )
        .prop_map(|(name, ext, data, populated)| {
            if populated {
                TokenEntry::new(name, ext, data)
            } else {
                TokenEntry::tombstone(name, ext)
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn store_roundtrip(entries in prop::collection::vec(arb_entry(), 0..250)) {
        let bytes = encode(&entries);
        prop_assert!(verify(&bytes).is_ok());
        prop_assert_eq!(decode(&bytes).unwrap(), entries);
    }

    #[test]
    fn meta_roundtrip(name in "[A-Za-z#$]{0,16}", pairs in prop::collection::vec(("[a-z]{1,8}", "[ -~]{0,16}"), 0..10)) {
        let mut meta = TokenMeta::new(name);
        for (k, v) in pairs {
            meta.insert(k, v);
        }
        prop_assert_eq!(TokenMeta::decode(&meta.serialize()).unwrap(), meta);
    }
}
