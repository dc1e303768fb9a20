use super::*;

const ZERO_KEY: [u8; 16] = [0u8; 16];

#[test]
fn build_basic_matches_an_independently_computed_bitstream() {
    let elements = vec![b"hello".to_vec(), b"world".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    assert_eq!(filter.element_count(), 2);
    assert_eq!(filter.data, hex::decode("a95d714c7400").unwrap());
}

#[test]
fn build_basic_single_element_matches_an_independently_computed_bitstream() {
    let elements = vec![b"solo".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    assert_eq!(filter.element_count(), 1);
    assert_eq!(filter.data, hex::decode("204a40").unwrap());
}

#[test]
fn contains_finds_members_and_rejects_non_members() {
    let elements = vec![b"hello".to_vec(), b"world".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    assert!(filter.contains(&ZERO_KEY, b"hello"));
    assert!(filter.contains(&ZERO_KEY, b"world"));
    assert!(!filter.contains(&ZERO_KEY, b"xyz"));
    assert!(!filter.contains(&ZERO_KEY, b"nope"));
}

#[test]
fn contains_any_matches_if_at_least_one_query_element_is_present() {
    let elements = vec![b"hello".to_vec(), b"world".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    assert!(filter.contains_any(&ZERO_KEY, &[b"nope".to_vec(), b"world".to_vec()]));
    assert!(!filter.contains_any(&ZERO_KEY, &[b"nope".to_vec(), b"xyz".to_vec()]));
}

#[test]
fn empty_filter_never_matches() {
    let filter = Filter::build_basic(&ZERO_KEY, &[]);
    assert_eq!(filter.element_count(), 0);
    assert!(!filter.contains(&ZERO_KEY, b"anything"));
}

#[test]
fn serialize_round_trips_through_parse() {
    let elements = vec![b"hello".to_vec(), b"world".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    let wire = filter.serialize();
    let parsed = Filter::parse(&wire).unwrap();
    assert_eq!(parsed.element_count(), filter.element_count());
    assert!(parsed.contains(&ZERO_KEY, b"hello"));
}

#[test]
fn filter_header_chains_from_the_zero_hash_for_a_genesis_filter() {
    let elements = vec![b"coinbase-output-script".to_vec()];
    let filter = Filter::build_basic(&ZERO_KEY, &elements);
    let fh = filter_hash(&filter);
    let header = filter_header(&fh, &Hash32::ZERO);
    assert!(verify_filter_header(&filter, &Hash32::ZERO, &header).is_ok());

    let wrong_previous = Hash32::from_bytes([0x01u8; 32]);
    assert!(verify_filter_header(&filter, &wrong_previous, &header).is_err());
}
