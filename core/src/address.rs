//! The address value type: BIP-155 (`addrv2`) and legacy `addr` transports,
//! plus the stable peer identity used for deduplication (spec §4.8).

use crate::bytes::{ReadView, WriteBuffer};
use crate::error::ParseError;
use crate::hash::{self, Hash32};
use std::fmt;

/// A reachable transport for a peer address. Fixed-width payloads match
/// BIP-155's per-network address lengths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    Invalid,
    Ipv4([u8; 4]),
    Ipv6([u8; 16]),
    /// Deprecated Tor v2 (onion service) address; still accepted on decode.
    Onion2([u8; 10]),
    Onion3([u8; 32]),
    /// I2P ".b32.i2p" destination hash.
    Eep([u8; 32]),
    Cjdns([u8; 16]),
    /// Supplemented transport for collaborator ZMQ-based signaling,
    /// gated behind the `zmq-transport` feature (DESIGN.md open question).
    #[cfg(feature = "zmq-transport")]
    Zmq(Vec<u8>),
}

impl Transport {
    /// BIP-155 on-wire network ID byte. `90` for ZMQ is this crate's own
    /// extension, outside the BIP-155 assigned range.
    pub fn network_id(&self) -> u8 {
        match self {
            Transport::Invalid => 0,
            Transport::Ipv4(_) => 1,
            Transport::Ipv6(_) => 2,
            Transport::Onion2(_) => 3,
            Transport::Onion3(_) => 4,
            Transport::Eep(_) => 5,
            Transport::Cjdns(_) => 6,
            #[cfg(feature = "zmq-transport")]
            Transport::Zmq(_) => 90,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Transport::Invalid => Vec::new(),
            Transport::Ipv4(b) => b.to_vec(),
            Transport::Ipv6(b) => b.to_vec(),
            Transport::Onion2(b) => b.to_vec(),
            Transport::Onion3(b) => b.to_vec(),
            Transport::Eep(b) => b.to_vec(),
            Transport::Cjdns(b) => b.to_vec(),
            #[cfg(feature = "zmq-transport")]
            Transport::Zmq(b) => b.clone(),
        }
    }

    fn from_network_id(network_id: u8, payload: &[u8]) -> Result<Self, ParseError> {
        fn fixed<const N: usize>(payload: &[u8], context: &'static str) -> Result<[u8; N], ParseError> {
            payload
                .try_into()
                .map_err(|_| ParseError::invalid(context, format!("expected {N} bytes, got {}", payload.len())))
        }

        Ok(match network_id {
            1 => Transport::Ipv4(fixed(payload, "address.ipv4")?),
            2 => Transport::Ipv6(fixed(payload, "address.ipv6")?),
            3 => Transport::Onion2(fixed(payload, "address.onion2")?),
            4 => Transport::Onion3(fixed(payload, "address.onion3")?),
            5 => Transport::Eep(fixed(payload, "address.eep")?),
            6 => Transport::Cjdns(fixed(payload, "address.cjdns")?),
            #[cfg(feature = "zmq-transport")]
            90 => Transport::Zmq(payload.to_vec()),
            other => {
                return Err(ParseError::invalid(
                    "address.network_id",
                    format!("unknown BIP-155 network id {other}"),
                ))
            }
        })
    }
}

const BASE32_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

/// RFC-4648 base32, lowercase, unpadded — enough to render onion/i2p
/// addresses readably. This does not compute Tor's onion-address checksum
/// suffix; the result is a stable but non-canonical display form.
fn base32_encode(data: &[u8]) -> String {
    let mut bits: u32 = 0;
    let mut bit_count = 0u32;
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    for &byte in data {
        bits = (bits << 8) | byte as u32;
        bit_count += 8;
        while bit_count >= 5 {
            bit_count -= 5;
            out.push(BASE32_ALPHABET[((bits >> bit_count) & 0x1f) as usize] as char);
        }
    }
    if bit_count > 0 {
        out.push(BASE32_ALPHABET[((bits << (5 - bit_count)) & 0x1f) as usize] as char);
    }
    out
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Invalid => write!(f, "invalid"),
            Transport::Ipv4(b) => write!(f, "{}.{}.{}.{}", b[0], b[1], b[2], b[3]),
            Transport::Ipv6(b) => write!(f, "{}", std::net::Ipv6Addr::from(*b)),
            Transport::Onion2(b) => write!(f, "{}.onion", base32_encode(b)),
            Transport::Onion3(b) => write!(f, "{}.onion", base32_encode(b)),
            Transport::Eep(b) => write!(f, "{}.b32.i2p", base32_encode(b)),
            Transport::Cjdns(b) => write!(f, "{}", std::net::Ipv6Addr::from(*b)),
            #[cfg(feature = "zmq-transport")]
            Transport::Zmq(b) => write!(f, "zmq:{}", hex::encode(b)),
        }
    }
}

/// A peer address record as carried in `addr`/`addrv2` messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// Unix timestamp this address was last seen advertised — mutable.
    pub time: u32,
    /// Advertised service-flag bitmask (spec §9 / [`crate::chain::service_flags`]) — mutable.
    pub services: u64,
    pub transport: Transport,
    pub port: u16,
}

impl Address {
    /// A stable identity for deduplication/addrman keying: the transport and
    /// port, with the mutable `time`/`services` fields zeroed before
    /// hashing.
    pub fn id(&self) -> Hash32 {
        let mut w = WriteBuffer::new();
        w.write_u8(self.transport.network_id());
        w.write_compact_bytes(&self.transport.payload());
        w.write_u16_be(self.port);
        hash::sha256d(w.as_slice())
    }

    /// Parse a BIP-155 `addrv2` entry.
    pub fn parse_v2(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let time = view.read_u32_le("address.time")?;
        let services = view.read_compact_size("address.services")?;
        let network_id = view.read_u8("address.network_id")?;
        let payload = view.read_compact_bytes("address.payload")?;
        let transport = Transport::from_network_id(network_id, payload)?;
        let port = view.read_u16_be("address.port")?;
        Ok(Address {
            time,
            services,
            transport,
            port,
        })
    }

    pub fn serialize_v2(&self, w: &mut WriteBuffer) {
        w.write_u32_le(self.time);
        w.write_compact_size(self.services);
        w.write_u8(self.transport.network_id());
        w.write_compact_bytes(&self.transport.payload());
        w.write_u16_be(self.port);
    }

    /// Parse a legacy (pre-BIP155) `addr` entry: fixed 16-byte address,
    /// IPv4 represented as an IPv4-mapped IPv6 address (`::ffff:a.b.c.d`).
    pub fn parse_legacy(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let time = view.read_u32_le("address.time")?;
        let services = view.read_u64_le("address.services")?;
        let raw: [u8; 16] = view.take_array("address.addr")?;
        let port = view.read_u16_be("address.port")?;
        let transport = if raw[0..12] == IPV4_MAPPED_PREFIX {
            Transport::Ipv4(raw[12..16].try_into().expect("4 bytes"))
        } else if raw[0] == 0xfc {
            Transport::Cjdns(raw)
        } else if raw[0..6] == ONIONCAT_PREFIX {
            Transport::Onion2(raw[6..16].try_into().expect("10 bytes"))
        } else {
            Transport::Ipv6(raw)
        };
        Ok(Address {
            time,
            services,
            transport,
            port,
        })
    }

    pub fn serialize_legacy(&self, w: &mut WriteBuffer) -> Result<(), ParseError> {
        w.write_u32_le(self.time);
        w.write_u64_le(self.services);
        let raw: [u8; 16] = match &self.transport {
            Transport::Ipv4(b) => {
                let mut full = [0u8; 16];
                full[0..12].copy_from_slice(&IPV4_MAPPED_PREFIX);
                full[12..16].copy_from_slice(b);
                full
            }
            Transport::Ipv6(b) => *b,
            Transport::Cjdns(b) => *b,
            Transport::Onion2(b) => {
                let mut full = [0u8; 16];
                full[0..6].copy_from_slice(&ONIONCAT_PREFIX);
                full[6..16].copy_from_slice(b);
                full
            }
            other => {
                return Err(ParseError::invalid(
                    "address.legacy_transport",
                    format!("transport {other} has no legacy `addr` representation"),
                ))
            }
        };
        w.write_bytes(&raw);
        w.write_u16_be(self.port);
        Ok(())
    }
}

const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];
/// The "OnionCat" prefix (RFC 4193 `fd00::/8` + Tor's reserved `87d8:7eeb:43`)
/// used to embed a 10-byte Tor v2 onion address inside a legacy 16-byte
/// `addr` field.
const ONIONCAT_PREFIX: [u8; 6] = [0xfd, 0x87, 0xd8, 0x7e, 0xeb, 0x43];

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transport, self.port)
    }
}
