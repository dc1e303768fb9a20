//! The message dispatch table: every named P2P message this crate knows how
//! to decode, plus a passthrough for anything else (spec §4.5).

use super::inventory::{self, InventoryItem};
use super::version::Version;
use super::Frame;
use crate::bytes::{ByteArray, ReadView, WriteBuffer};
use crate::error::{CodecError, ParseError};
use crate::filter::Filter;
use crate::hash::Hash32;
use crate::header::{Header, HEADER_LEN};
use crate::transaction::EncodedTransaction;

/// A locator-based header/block request: known locator hashes plus a stop
/// hash, as carried by `getheaders`/`getblocks`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockLocator {
    pub version: u32,
    pub locator_hashes: Vec<Hash32>,
    pub stop_hash: Hash32,
}

impl BlockLocator {
    fn parse(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let version = view.read_u32_le("locator.version")?;
        let count = view.read_compact_size("locator.count")?;
        let mut locator_hashes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            locator_hashes.push(Hash32::from_bytes(view.take_array("locator.hash")?));
        }
        let stop_hash = Hash32::from_bytes(view.take_array("locator.stop_hash")?);
        Ok(BlockLocator {
            version,
            locator_hashes,
            stop_hash,
        })
    }

    fn serialize(&self, w: &mut WriteBuffer) {
        w.write_u32_le(self.version);
        w.write_compact_size(self.locator_hashes.len() as u64);
        for h in &self.locator_hashes {
            w.write_bytes(h.as_bytes());
        }
        w.write_bytes(self.stop_hash.as_bytes());
    }
}

/// A `cfilter`/`cfheaders`/`cfcheckpt`/`getcfilters`/`getcfheaders`/
/// `getcfcheckpt` filter-type byte. `0` is the only BIP-157 basic filter
/// type currently assigned.
pub const BASIC_FILTER_TYPE: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CFilterMessage {
    pub filter_type: u8,
    pub block_hash: Hash32,
    pub filter: Filter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CFHeadersMessage {
    pub filter_type: u8,
    pub stop_hash: Hash32,
    pub previous_filter_header: Hash32,
    pub filter_hashes: Vec<Hash32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CFCheckptMessage {
    pub filter_type: u8,
    pub stop_hash: Hash32,
    pub filter_headers: Vec<Hash32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetCFiltersMessage {
    pub filter_type: u8,
    pub start_height: u32,
    pub stop_hash: Hash32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetCFCheckptMessage {
    pub filter_type: u8,
    pub stop_hash: Hash32,
}

/// A `merkleblock` message: a block header plus a partial merkle tree (BIP
/// 37) proving a set of transactions are included in it. Unlike
/// `cmpctblock`/`blocktxn`, this has a fully recoverable structured layout,
/// so it gets its own variant instead of the opaque passthrough.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleblockMessage {
    pub block_header: Header,
    pub txn_count: u32,
    pub hashes: Vec<Hash32>,
    pub flags: ByteArray,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectMessage {
    pub rejected_command: String,
    pub code: u8,
    pub reason: String,
    /// Present for tx/block rejections: the txid/block hash in question.
    pub data: Option<Hash32>,
}

/// Every message this crate can decode by name. `Unknown` passes through
/// any command not in the dispatch table rather than failing the whole
/// stream, per spec §4.5.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Version(Version),
    VerAck,
    Ping { nonce: u64 },
    Pong { nonce: u64 },
    GetHeaders(BlockLocator),
    Headers(Vec<Header>),
    GetBlocks(BlockLocator),
    Inv(Vec<InventoryItem>),
    GetData(Vec<InventoryItem>),
    NotFound(Vec<InventoryItem>),
    GetAddr,
    Addr(Vec<(u32, crate::address::Address)>),
    AddrV2(Vec<crate::address::Address>),
    SendAddrV2,
    Mempool,
    GetCFilters(GetCFiltersMessage),
    CFilter(CFilterMessage),
    GetCFHeaders(GetCFiltersMessage),
    CFHeaders(CFHeadersMessage),
    GetCFCheckpt(GetCFCheckptMessage),
    CFCheckpt(CFCheckptMessage),
    Tx(EncodedTransaction),
    /// A full block, kept as raw bytes; parse with
    /// [`crate::parser::parse_block`]/[`crate::block::Block::parse`].
    Block(ByteArray),
    Reject(RejectMessage),
    Merkleblock(MerkleblockMessage),
    /// Opaque passthrough for `cmpctblock`, `blocktxn`, and any command
    /// outside this crate's dispatch table.
    Unknown { command: String, payload: ByteArray },
}

fn write_inventory(w: &mut WriteBuffer, items: &[InventoryItem]) {
    inventory::serialize_vec(items, w);
}

fn parse_filter_type(view: &mut ReadView<'_>) -> Result<u8, ParseError> {
    view.read_u8("cfilter.filter_type")
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Message::Version(_) => "version",
            Message::VerAck => "verack",
            Message::Ping { .. } => "ping",
            Message::Pong { .. } => "pong",
            Message::GetHeaders(_) => "getheaders",
            Message::Headers(_) => "headers",
            Message::GetBlocks(_) => "getblocks",
            Message::Inv(_) => "inv",
            Message::GetData(_) => "getdata",
            Message::NotFound(_) => "notfound",
            Message::GetAddr => "getaddr",
            Message::Addr(_) => "addr",
            Message::AddrV2(_) => "addrv2",
            Message::SendAddrV2 => "sendaddrv2",
            Message::Mempool => "mempool",
            Message::GetCFilters(_) => "getcfilters",
            Message::CFilter(_) => "cfilter",
            Message::GetCFHeaders(_) => "getcfheaders",
            Message::CFHeaders(_) => "cfheaders",
            Message::GetCFCheckpt(_) => "getcfcheckpt",
            Message::CFCheckpt(_) => "cfcheckpt",
            Message::Tx(_) => "tx",
            Message::Block(_) => "block",
            Message::Reject(_) => "reject",
            Message::Merkleblock(_) => "merkleblock",
            Message::Unknown { .. } => "unknown",
        }
    }

    pub fn encode(&self) -> Result<Frame, ParseError> {
        let mut w = WriteBuffer::new();
        let command: String = match self {
            Message::Version(v) => {
                w.write_bytes(&v.serialize()?);
                "version".to_string()
            }
            Message::VerAck => "verack".to_string(),
            Message::Ping { nonce } => {
                w.write_u64_le(*nonce);
                "ping".to_string()
            }
            Message::Pong { nonce } => {
                w.write_u64_le(*nonce);
                "pong".to_string()
            }
            Message::GetHeaders(locator) => {
                locator.serialize(&mut w);
                "getheaders".to_string()
            }
            Message::GetBlocks(locator) => {
                locator.serialize(&mut w);
                "getblocks".to_string()
            }
            Message::Headers(headers) => {
                w.write_compact_size(headers.len() as u64);
                for h in headers {
                    w.write_bytes(&h.serialize());
                    w.write_compact_size(0); // tx_count is always 0 on the wire
                }
                "headers".to_string()
            }
            Message::Inv(items) => {
                write_inventory(&mut w, items);
                "inv".to_string()
            }
            Message::GetData(items) => {
                write_inventory(&mut w, items);
                "getdata".to_string()
            }
            Message::NotFound(items) => {
                write_inventory(&mut w, items);
                "notfound".to_string()
            }
            Message::GetAddr => "getaddr".to_string(),
            Message::Addr(entries) => {
                w.write_compact_size(entries.len() as u64);
                for (time, addr) in entries {
                    w.write_u32_le(*time);
                    addr.serialize_legacy(&mut w)?;
                }
                "addr".to_string()
            }
            Message::AddrV2(addrs) => {
                w.write_compact_size(addrs.len() as u64);
                for addr in addrs {
                    addr.serialize_v2(&mut w);
                }
                "addrv2".to_string()
            }
            Message::SendAddrV2 => "sendaddrv2".to_string(),
            Message::Mempool => "mempool".to_string(),
            Message::GetCFilters(m) => {
                w.write_u8(m.filter_type);
                w.write_u32_le(m.start_height);
                w.write_bytes(m.stop_hash.as_bytes());
                "getcfilters".to_string()
            }
            Message::CFilter(m) => {
                w.write_u8(m.filter_type);
                w.write_bytes(m.block_hash.as_bytes());
                w.write_bytes(&m.filter.serialize());
                "cfilter".to_string()
            }
            Message::GetCFHeaders(m) => {
                w.write_u8(m.filter_type);
                w.write_u32_le(m.start_height);
                w.write_bytes(m.stop_hash.as_bytes());
                "getcfheaders".to_string()
            }
            Message::CFHeaders(m) => {
                w.write_u8(m.filter_type);
                w.write_bytes(m.stop_hash.as_bytes());
                w.write_bytes(m.previous_filter_header.as_bytes());
                w.write_compact_size(m.filter_hashes.len() as u64);
                for h in &m.filter_hashes {
                    w.write_bytes(h.as_bytes());
                }
                "cfheaders".to_string()
            }
            Message::GetCFCheckpt(m) => {
                w.write_u8(m.filter_type);
                w.write_bytes(m.stop_hash.as_bytes());
                "getcfcheckpt".to_string()
            }
            Message::CFCheckpt(m) => {
                w.write_u8(m.filter_type);
                w.write_bytes(m.stop_hash.as_bytes());
                w.write_compact_size(m.filter_headers.len() as u64);
                for h in &m.filter_headers {
                    w.write_bytes(h.as_bytes());
                }
                "cfcheckpt".to_string()
            }
            Message::Tx(tx) => {
                w.write_bytes(&tx.serialize());
                "tx".to_string()
            }
            Message::Block(bytes) => {
                w.write_bytes(bytes.as_slice());
                "block".to_string()
            }
            Message::Reject(r) => {
                w.write_compact_bytes(r.rejected_command.as_bytes());
                w.write_u8(r.code);
                w.write_compact_bytes(r.reason.as_bytes());
                if let Some(data) = &r.data {
                    w.write_bytes(data.as_bytes());
                }
                "reject".to_string()
            }
            Message::Merkleblock(m) => {
                w.write_bytes(&m.block_header.serialize());
                w.write_u32_le(m.txn_count);
                w.write_compact_size(m.hashes.len() as u64);
                for h in &m.hashes {
                    w.write_bytes(h.as_bytes());
                }
                w.write_compact_bytes(m.flags.as_slice());
                "merkleblock".to_string()
            }
            Message::Unknown { command, payload } => {
                w.write_bytes(payload.as_slice());
                command.clone()
            }
        };
        Ok(Frame::new(command, w.into_vec()))
    }

    pub fn decode(frame: &Frame) -> Result<Self, CodecError> {
        let mut view = ReadView::new(&frame.payload);
        let message = match frame.command.as_str() {
            "version" => Message::Version(Version::parse(&mut view)?),
            "verack" => Message::VerAck,
            "ping" => Message::Ping {
                nonce: view.read_u64_le("ping.nonce")?,
            },
            "pong" => Message::Pong {
                nonce: view.read_u64_le("pong.nonce")?,
            },
            "getheaders" => Message::GetHeaders(BlockLocator::parse(&mut view)?),
            "getblocks" => Message::GetBlocks(BlockLocator::parse(&mut view)?),
            "headers" => {
                let count = view.read_compact_size("headers.count")?;
                let mut headers = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let header_bytes = view.take("headers.header", HEADER_LEN)?;
                    headers.push(Header::parse(header_bytes)?);
                    view.read_compact_size("headers.tx_count")?;
                }
                Message::Headers(headers)
            }
            "inv" => Message::Inv(inventory::parse_vec(&mut view)?),
            "getdata" => Message::GetData(inventory::parse_vec(&mut view)?),
            "notfound" => Message::NotFound(inventory::parse_vec(&mut view)?),
            "getaddr" => Message::GetAddr,
            "addr" => {
                let count = view.read_compact_size("addr.count")?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let time = view.read_u32_le("addr.time")?;
                    entries.push((time, crate::address::Address::parse_legacy(&mut view)?));
                }
                Message::Addr(entries)
            }
            "addrv2" => {
                let count = view.read_compact_size("addrv2.count")?;
                let mut addrs = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    addrs.push(crate::address::Address::parse_v2(&mut view)?);
                }
                Message::AddrV2(addrs)
            }
            "sendaddrv2" => Message::SendAddrV2,
            "mempool" => Message::Mempool,
            "getcfilters" => Message::GetCFilters(GetCFiltersMessage {
                filter_type: parse_filter_type(&mut view)?,
                start_height: view.read_u32_le("getcfilters.start_height")?,
                stop_hash: Hash32::from_bytes(view.take_array("getcfilters.stop_hash")?),
            }),
            "cfilter" => Message::CFilter(CFilterMessage {
                filter_type: parse_filter_type(&mut view)?,
                block_hash: Hash32::from_bytes(view.take_array("cfilter.block_hash")?),
                filter: Filter::parse(view.rest()).map_err(|e| {
                    CodecError::Parse(ParseError::invalid("cfilter.data", e.to_string()))
                })?,
            }),
            "getcfheaders" => Message::GetCFHeaders(GetCFiltersMessage {
                filter_type: parse_filter_type(&mut view)?,
                start_height: view.read_u32_le("getcfheaders.start_height")?,
                stop_hash: Hash32::from_bytes(view.take_array("getcfheaders.stop_hash")?),
            }),
            "cfheaders" => {
                let filter_type = parse_filter_type(&mut view)?;
                let stop_hash = Hash32::from_bytes(view.take_array("cfheaders.stop_hash")?);
                let previous_filter_header =
                    Hash32::from_bytes(view.take_array("cfheaders.previous_filter_header")?);
                let count = view.read_compact_size("cfheaders.count")?;
                let mut filter_hashes = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    filter_hashes.push(Hash32::from_bytes(view.take_array("cfheaders.hash")?));
                }
                Message::CFHeaders(CFHeadersMessage {
                    filter_type,
                    stop_hash,
                    previous_filter_header,
                    filter_hashes,
                })
            }
            "getcfcheckpt" => Message::GetCFCheckpt(GetCFCheckptMessage {
                filter_type: parse_filter_type(&mut view)?,
                stop_hash: Hash32::from_bytes(view.take_array("getcfcheckpt.stop_hash")?),
            }),
            "cfcheckpt" => {
                let filter_type = parse_filter_type(&mut view)?;
                let stop_hash = Hash32::from_bytes(view.take_array("cfcheckpt.stop_hash")?);
                let count = view.read_compact_size("cfcheckpt.count")?;
                let mut filter_headers = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    filter_headers.push(Hash32::from_bytes(view.take_array("cfcheckpt.hash")?));
                }
                Message::CFCheckpt(CFCheckptMessage {
                    filter_type,
                    stop_hash,
                    filter_headers,
                })
            }
            "tx" => Message::Tx(crate::parser::parse_standalone_transaction(&frame.payload)?),
            "block" => Message::Block(ByteArray::new(frame.payload.clone())),
            "reject" => {
                let rejected_command =
                    String::from_utf8_lossy(view.read_compact_bytes("reject.message")?)
                        .into_owned();
                let code = view.read_u8("reject.code")?;
                let reason = String::from_utf8_lossy(view.read_compact_bytes("reject.reason")?)
                    .into_owned();
                let data = if view.is_empty() {
                    None
                } else {
                    Some(Hash32::from_bytes(view.take_array("reject.data")?))
                };
                Message::Reject(RejectMessage {
                    rejected_command,
                    code,
                    reason,
                    data,
                })
            }
            "merkleblock" => {
                let header_bytes = view.take("merkleblock.header", HEADER_LEN)?;
                let block_header = Header::parse(header_bytes)?;
                let txn_count = view.read_u32_le("merkleblock.txn_count")?;
                let hash_count = view.read_compact_size("merkleblock.hash_count")?;
                let mut hashes = Vec::with_capacity(hash_count as usize);
                for _ in 0..hash_count {
                    hashes.push(Hash32::from_bytes(view.take_array("merkleblock.hash")?));
                }
                let flags = view.read_compact_bytes("merkleblock.flags")?;
                Message::Merkleblock(MerkleblockMessage {
                    block_header,
                    txn_count,
                    hashes,
                    flags: ByteArray::new(flags.to_vec()),
                })
            }
            other => Message::Unknown {
                command: other.to_string(),
                payload: ByteArray::new(frame.payload.clone()),
            },
        };
        Ok(message)
    }
}
