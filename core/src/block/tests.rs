use super::*;

const GENESIS_BLOCK_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c0101000000010000000000000000000000000000000000000000000000000000000000000000ffffffff4d04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c6f757420666f722062616e6b73ffffffff0100f2052a01000000434104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5fac00000000";

fn genesis_block() -> Block {
    let bytes = hex::decode(GENESIS_BLOCK_HEX).unwrap();
    Block::parse(&bytes, None).unwrap()
}

#[test]
fn genesis_block_has_one_coinbase_transaction() {
    let block = genesis_block();
    assert_eq!(block.transaction_count(), 1);
    assert!(block.wtxids().is_none());
    let coinbase_txid = block.txids()[0];
    assert!(block.transaction(&coinbase_txid).is_some());
    assert_eq!(
        block.coinbase().outputs[0].value,
        5_000_000_000
    );
}

#[test]
fn serialized_size_matches_the_raw_byte_length() {
    let bytes = hex::decode(GENESIS_BLOCK_HEX).unwrap();
    let block = Block::parse(&bytes, None).unwrap();
    assert_eq!(block.serialized_size(), bytes.len());
}

#[test]
fn weight_on_a_legacy_only_block_equals_its_size_times_scale_with_no_witness_discount() {
    let block = genesis_block();
    // No witnesses present, so weight == total_size * scale - base*(scale-1)
    // collapses to total_size regardless of scale since base == total here.
    let weight = block.weight(Chain::Bitcoin);
    assert_eq!(weight, block.serialized_size() as u64);
}

#[test]
fn from_parsed_rejects_a_checking_mode_parse() {
    let bytes = hex::decode(GENESIS_BLOCK_HEX).unwrap();
    let parsed = parser::parse_block(&bytes, None, ParseMode::Checking).unwrap();
    let err = Block::from_parsed(parsed).unwrap_err();
    assert!(matches!(err, ParseError::Invalid { context: "block.transactions", .. }));
}
