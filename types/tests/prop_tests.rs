use proptest::prelude::*;

use opgov_types::{Address, Decimal, Timestamp, UnitHash};

proptest! {
    /// UnitHash roundtrip through its hex form.
    #[test]
    fn unit_hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = UnitHash::new(bytes);
        prop_assert_eq!(UnitHash::from_hex(&hash.to_string()).unwrap(), hash);
    }

    /// UnitHash bincode serialization carries the raw bytes.
    #[test]
    fn unit_hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = UnitHash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: UnitHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.as_bytes(), hash.as_bytes());
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// has_aged is true exactly from the threshold onwards.
    #[test]
    fn timestamp_has_aged_boundary(start in 0u64..500_000, age in 1u64..500_000) {
        let t = Timestamp::new(start);
        prop_assert!(t.has_aged(age, Timestamp::new(start + age)));
        prop_assert!(!t.has_aged(age, Timestamp::new(start + age - 1)));
    }

    /// Any base32 string of the right length is a valid address.
    #[test]
    fn base32_strings_are_addresses(s in "[A-Z2-7]{32}") {
        let addr = Address::parse(&s).unwrap();
        prop_assert_eq!(addr.as_str(), s.as_str());
    }

    /// Display and parse agree, and appending zeros never changes the value.
    #[test]
    fn decimal_display_parse_agree(int in 0u64..1_000_000_000, frac in 0u32..1_000_000, zeros in 0usize..6) {
        let text = format!("{int}.{frac:06}{}", "0".repeat(zeros));
        let value: Decimal = text.parse().unwrap();
        let reparsed: Decimal = value.to_string().parse().unwrap();
        prop_assert_eq!(value, reparsed);
        let plain: Decimal = format!("{int}.{frac:06}").parse().unwrap();
        prop_assert_eq!(value, plain);
    }
}
