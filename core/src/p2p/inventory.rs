//! Inventory vectors, as carried by `inv`/`getdata`/`notfound`.

use crate::bytes::{ReadView, WriteBuffer};
use crate::error::ParseError;
use crate::hash::Hash32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryKind {
    Error,
    Tx,
    Block,
    FilteredBlock,
    CompactBlock,
    WitnessTx,
    WitnessBlock,
    FilteredWitnessBlock,
    Other(u32),
}

impl InventoryKind {
    fn to_u32(self) -> u32 {
        match self {
            InventoryKind::Error => 0,
            InventoryKind::Tx => 1,
            InventoryKind::Block => 2,
            InventoryKind::FilteredBlock => 3,
            InventoryKind::CompactBlock => 4,
            InventoryKind::WitnessTx => 0x4000_0001,
            InventoryKind::WitnessBlock => 0x4000_0002,
            InventoryKind::FilteredWitnessBlock => 0x4000_0003,
            InventoryKind::Other(v) => v,
        }
    }

    fn from_u32(v: u32) -> Self {
        match v {
            0 => InventoryKind::Error,
            1 => InventoryKind::Tx,
            2 => InventoryKind::Block,
            3 => InventoryKind::FilteredBlock,
            4 => InventoryKind::CompactBlock,
            0x4000_0001 => InventoryKind::WitnessTx,
            0x4000_0002 => InventoryKind::WitnessBlock,
            0x4000_0003 => InventoryKind::FilteredWitnessBlock,
            other => InventoryKind::Other(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    pub kind: InventoryKind,
    pub hash: Hash32,
}

impl InventoryItem {
    pub fn parse(view: &mut ReadView<'_>) -> Result<Self, ParseError> {
        let kind = InventoryKind::from_u32(view.read_u32_le("inventory.type")?);
        let hash = Hash32::from_bytes(view.take_array("inventory.hash")?);
        Ok(InventoryItem { kind, hash })
    }

    pub fn serialize(&self, w: &mut WriteBuffer) {
        w.write_u32_le(self.kind.to_u32());
        w.write_bytes(self.hash.as_bytes());
    }
}

pub fn parse_vec(view: &mut ReadView<'_>) -> Result<Vec<InventoryItem>, ParseError> {
    let count = view.read_compact_size("inventory.count")?;
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(InventoryItem::parse(view)?);
    }
    Ok(items)
}

pub fn serialize_vec(items: &[InventoryItem], w: &mut WriteBuffer) {
    w.write_compact_size(items.len() as u64);
    for item in items {
        item.serialize(w);
    }
}
