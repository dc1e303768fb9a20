//! The P2P wire codec: the 24-byte frame header shared by every message,
//! plus BIP-155/BIP-157 message bodies (spec §4.5).

pub mod inventory;
pub mod message;
pub mod version;

pub use message::Message;

use crate::bytes::{ReadView, WriteBuffer};
use crate::error::CodecError;
use crate::hash;

pub const COMMAND_LEN: usize = 12;
pub const FRAME_HEADER_LEN: usize = 4 + COMMAND_LEN + 4 + 4;
/// Wire payload size cap (32 MiB, matching Bitcoin Core's `MAX_PROTOCOL_MESSAGE_LENGTH`).
pub const MAX_PAYLOAD_LEN: u32 = 32 * 1024 * 1024;

/// A framed P2P message: command name and raw payload, checksum/length
/// already validated against the frame header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub payload: Vec<u8>,
}

fn command_bytes(command: &str) -> [u8; COMMAND_LEN] {
    let mut buf = [0u8; COMMAND_LEN];
    let bytes = command.as_bytes();
    let n = bytes.len().min(COMMAND_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    buf
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = hash::sha256d(payload);
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest.as_bytes()[0..4]);
    out
}

impl Frame {
    pub fn new(command: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }

    pub fn serialize(&self, magic: [u8; 4]) -> Vec<u8> {
        let mut w = WriteBuffer::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        w.write_bytes(&magic);
        w.write_bytes(&command_bytes(&self.command));
        w.write_u32_le(self.payload.len() as u32);
        w.write_bytes(&checksum(&self.payload));
        w.write_bytes(&self.payload);
        w.into_vec()
    }

    /// Parse one frame from the front of `data`, returning it and the
    /// number of bytes consumed (so callers can keep decoding a stream).
    pub fn parse(data: &[u8], magic: [u8; 4]) -> Result<(Self, usize), CodecError> {
        let mut view = ReadView::new(data);
        let frame_magic: [u8; 4] = view.take_array("p2p.magic").map_err(CodecError::Parse)?;
        if frame_magic != magic {
            return Err(CodecError::UnknownCommand(format!(
                "magic {} does not match expected {}",
                hex::encode(frame_magic),
                hex::encode(magic)
            )));
        }
        let command_raw: [u8; COMMAND_LEN] =
            view.take_array("p2p.command").map_err(CodecError::Parse)?;
        let nul = command_raw.iter().position(|&b| b == 0).unwrap_or(COMMAND_LEN);
        let command = String::from_utf8_lossy(&command_raw[..nul]).into_owned();

        let declared_len = view.read_u32_le("p2p.length").map_err(CodecError::Parse)?;
        if declared_len > MAX_PAYLOAD_LEN {
            return Err(CodecError::PayloadTooLarge {
                declared: declared_len,
                limit: MAX_PAYLOAD_LEN,
            });
        }
        let declared_checksum: [u8; 4] =
            view.take_array("p2p.checksum").map_err(CodecError::Parse)?;
        let payload = view
            .take("p2p.payload", declared_len as usize)
            .map_err(CodecError::Parse)?
            .to_vec();

        if checksum(&payload) != declared_checksum {
            return Err(CodecError::ChecksumMismatch { command });
        }

        let consumed = view.position();
        Ok((Frame { command, payload }, consumed))
    }
}
