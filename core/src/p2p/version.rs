//! The `version` handshake message.

use crate::address::Transport;
use crate::bytes::{ReadView, WriteBuffer};
use crate::error::ParseError;

/// A peer endpoint as embedded in `version` — no `time` field (unlike
/// `addr`/`addrv2` entries), and always a fixed 16-byte address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetAddr {
    pub services: u64,
    pub transport: Transport,
    pub port: u16,
}

const IPV4_MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];
/// The "OnionCat" prefix used to embed a 10-byte Tor v2 onion address inside
/// a fixed 16-byte `version` net_addr field (matches `address.rs`).
const ONIONCAT_PREFIX: [u8; 6] = [0xfd, 0x87, 0xd8, 0x7e, 0xeb, 0x43];

impl NetAddr {
    fn parse(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let services = view.read_u64_le("version.net_addr.services")?;
        let raw: [u8; 16] = view.take_array("version.net_addr.addr")?;
        let port = view.read_u16_be("version.net_addr.port")?;
        let transport = if raw[0..12] == IPV4_MAPPED_PREFIX {
            Transport::Ipv4(raw[12..16].try_into().expect("4 bytes"))
        } else if raw[0] == 0xfc {
            Transport::Cjdns(raw)
        } else if raw[0..6] == ONIONCAT_PREFIX {
            Transport::Onion2(raw[6..16].try_into().expect("10 bytes"))
        } else {
            Transport::Ipv6(raw)
        };
        Ok(NetAddr {
            services,
            transport,
            port,
        })
    }

    fn serialize(&self, w: &mut WriteBuffer) -> Result<(), ParseError> {
        w.write_u64_le(self.services);
        let raw = match &self.transport {
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
                    "version.net_addr",
                    format!("transport {other} has no fixed-width version representation"),
                ))
            }
        };
        w.write_bytes(&raw);
        w.write_u16_be(self.port);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub protocol_version: i32,
    pub services: u64,
    pub timestamp: i64,
    pub recv: NetAddr,
    pub from: NetAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub start_height: i32,
    /// BIP-37: absent on old peers, defaults to `true` when absent.
    pub relay: bool,
}

impl Version {
    pub fn parse(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let protocol_version = view.read_i32_le("version.protocol_version")?;
        let services = view.read_u64_le("version.services")?;
        let timestamp = view.read_i64_le("version.timestamp")?;
        let recv = NetAddr::parse(view)?;
        let from = NetAddr::parse(view)?;
        let nonce = view.read_u64_le("version.nonce")?;
        let user_agent_bytes = view.read_compact_bytes("version.user_agent")?;
        let user_agent = String::from_utf8_lossy(user_agent_bytes).into_owned();
        let start_height = view.read_i32_le("version.start_height")?;
        let relay = if view.is_empty() {
            true
        } else {
            view.read_u8("version.relay")? != 0
        };
        Ok(Version {
            protocol_version,
            services,
            timestamp,
            recv,
            from,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut w = WriteBuffer::new();
        w.write_i32_le(self.protocol_version);
        w.write_u64_le(self.services);
        w.write_i64_le(self.timestamp);
        self.recv.serialize(&mut w)?;
        self.from.serialize(&mut w)?;
        w.write_u64_le(self.nonce);
        w.write_compact_bytes(self.user_agent.as_bytes());
        w.write_i32_le(self.start_height);
        w.write_u8(self.relay as u8);
        Ok(w.into_vec())
    }
}
