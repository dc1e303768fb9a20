//! Per-chain wire parameters: magic bytes, default port, SegWit weight
//! scaling, and P2P service-flag bits (spec §9).

use clap::ValueEnum;

/// A chain this crate knows how to speak the wire protocol of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    BitcoinRegtest,
    Litecoin,
    Dogecoin,
    BitcoinCash,
}

/// Fixed per-chain wire/consensus parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub magic: [u8; 4],
    pub default_port: u16,
    /// SegWit discount divisor applied to witness bytes when computing
    /// transaction weight; `1` means the chain doesn't discount witness data
    /// (or has no SegWit at all, e.g. BitcoinCash/Dogecoin).
    pub segwit_weight_scale: u32,
    /// Whether BIP-155 `addrv2`/`sendaddrv2` messages are expected on this
    /// chain's P2P network.
    pub supports_addrv2: bool,
}

impl Chain {
    pub const fn params(self) -> &'static ChainParams {
        match self {
            Chain::Bitcoin => &ChainParams {
                magic: [0xf9, 0xbe, 0xb4, 0xd9],
                default_port: 8333,
                segwit_weight_scale: 4,
                supports_addrv2: true,
            },
            Chain::BitcoinTestnet => &ChainParams {
                magic: [0x0b, 0x11, 0x09, 0x07],
                default_port: 18333,
                segwit_weight_scale: 4,
                supports_addrv2: true,
            },
            Chain::BitcoinRegtest => &ChainParams {
                magic: [0xfa, 0xbf, 0xb5, 0xda],
                default_port: 18444,
                segwit_weight_scale: 4,
                supports_addrv2: true,
            },
            Chain::Litecoin => &ChainParams {
                magic: [0xfb, 0xc0, 0xb6, 0xdb],
                default_port: 9333,
                segwit_weight_scale: 4,
                supports_addrv2: false,
            },
            Chain::Dogecoin => &ChainParams {
                magic: [0xc0, 0xc0, 0xc0, 0xc0],
                default_port: 22556,
                segwit_weight_scale: 1,
                supports_addrv2: false,
            },
            Chain::BitcoinCash => &ChainParams {
                magic: [0xe3, 0xe1, 0xf3, 0xe8],
                default_port: 8333,
                segwit_weight_scale: 1,
                supports_addrv2: false,
            },
        }
    }
}

/// P2P service-flag bits advertised in `version` messages (spec §4.5).
pub mod service_flags {
    pub const NODE_NETWORK: u64 = 1 << 0;
    pub const NODE_GETUTXO: u64 = 1 << 1;
    pub const NODE_BLOOM: u64 = 1 << 2;
    pub const NODE_WITNESS: u64 = 1 << 3;
    pub const NODE_COMPACT_FILTERS: u64 = 1 << 6;
    pub const NODE_NETWORK_LIMITED: u64 = 1 << 10;

    const KNOWN: &[(u64, &str)] = &[
        (NODE_NETWORK, "NETWORK"),
        (NODE_GETUTXO, "GETUTXO"),
        (NODE_BLOOM, "BLOOM"),
        (NODE_WITNESS, "WITNESS"),
        (NODE_COMPACT_FILTERS, "COMPACT_FILTERS"),
        (NODE_NETWORK_LIMITED, "NETWORK_LIMITED"),
    ];

    /// Human-readable names of every known bit set in `services`, for logging.
    pub fn describe(services: u64) -> Vec<&'static str> {
        KNOWN
            .iter()
            .filter(|(bit, _)| services & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_mainnet_magic_matches_known_value() {
        assert_eq!(Chain::Bitcoin.params().magic, [0xf9, 0xbe, 0xb4, 0xd9]);
        assert_eq!(Chain::Bitcoin.params().default_port, 8333);
    }

    #[test]
    fn non_segwit_chains_do_not_discount_witness_weight() {
        assert_eq!(Chain::Dogecoin.params().segwit_weight_scale, 1);
        assert_eq!(Chain::BitcoinCash.params().segwit_weight_scale, 1);
    }

    #[test]
    fn service_flags_describe_known_bits_only() {
        let services = service_flags::NODE_NETWORK | service_flags::NODE_WITNESS | (1 << 20);
        let described = service_flags::describe(services);
        assert_eq!(described, vec!["NETWORK", "WITNESS"]);
    }
}
