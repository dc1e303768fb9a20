//! The script element model: a forward-pass parser over opcodes/push-data,
//! and a classifier for the standard output patterns (spec §4.3).

use crate::bytes::ReadView;
use strum::FromRepr;

/// Opcodes this crate needs to recognize for push-data and pattern matching.
/// Other opcodes are preserved via [`Opcode::Other`] rather than rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum Opcode {
    Op0 = 0x00,
    PushData1 = 0x4c,
    PushData2 = 0x4d,
    PushData4 = 0x4e,
    Op1Negate = 0x4f,
    Op1 = 0x51,
    Op16 = 0x60,
    Dup = 0x76,
    Equal = 0x87,
    EqualVerify = 0x88,
    Hash160 = 0xa9,
    CheckSig = 0xac,
    CheckMultisig = 0xae,
    Return = 0x6a,
}

/// A single parsed script element: the opcode byte, an optional push-data
/// payload, and whether the push was malformed (short of its declared
/// length). Malformed pushes are kept, not rejected — spec §4.3.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub opcode_byte: u8,
    pub data: Option<Vec<u8>>,
    pub invalid: bool,
}

impl Element {
    fn push(opcode_byte: u8, data: Vec<u8>) -> Self {
        Self {
            opcode_byte,
            data: Some(data),
            invalid: false,
        }
    }

    fn bare(opcode_byte: u8) -> Self {
        Self {
            opcode_byte,
            data: None,
            invalid: false,
        }
    }

    fn invalid_push(opcode_byte: u8, partial: Vec<u8>) -> Self {
        Self {
            opcode_byte,
            data: Some(partial),
            invalid: true,
        }
    }

    pub fn is_opcode(&self, op: Opcode) -> bool {
        self.opcode_byte == op as u8
    }

    pub fn data_len(&self, n: usize) -> bool {
        self.data.as_ref().map(|d| d.len() == n).unwrap_or(false)
    }
}

/// A parsed script: an ordered sequence of elements.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Script {
    pub elements: Vec<Element>,
}

impl Script {
    /// Parse `bytes` as a script. This never fails outright: malformed
    /// pushes are recorded with [`Element::invalid`] set and parsing
    /// continues best-effort, per spec §4.3.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut view = ReadView::new(bytes);
        let mut elements = Vec::new();

        while !view.is_empty() {
            // Opcode byte always exists here since the loop condition checked.
            let opcode_byte = view.read_u8("script.opcode").expect("checked non-empty");

            let push_len: Option<usize> = match opcode_byte {
                0x01..=0x4b => Some(opcode_byte as usize),
                x if x == Opcode::PushData1 as u8 => {
                    match view.read_u8("script.pushdata1_len") {
                        Ok(n) => Some(n as usize),
                        Err(_) => {
                            elements.push(Element::invalid_push(opcode_byte, Vec::new()));
                            break;
                        }
                    }
                }
                x if x == Opcode::PushData2 as u8 => {
                    match view.read_u16_le("script.pushdata2_len") {
                        Ok(n) => Some(n as usize),
                        Err(_) => {
                            elements.push(Element::invalid_push(opcode_byte, Vec::new()));
                            break;
                        }
                    }
                }
                x if x == Opcode::PushData4 as u8 => {
                    match view.read_u32_le("script.pushdata4_len") {
                        Ok(n) => Some(n as usize),
                        Err(_) => {
                            elements.push(Element::invalid_push(opcode_byte, Vec::new()));
                            break;
                        }
                    }
                }
                _ => None,
            };

            match push_len {
                Some(len) => {
                    if view.remaining() >= len {
                        let data = view.take("script.push_data", len).expect("checked").to_vec();
                        elements.push(Element::push(opcode_byte, data));
                    } else {
                        let partial = view.rest().to_vec();
                        view.advance(view.remaining());
                        elements.push(Element::invalid_push(opcode_byte, partial));
                    }
                }
                None => elements.push(Element::bare(opcode_byte)),
            }
        }

        Script { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Standard output-script patterns recognized by spec §4.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    P2pkh,
    P2pk,
    P2wpkh,
    P2wsh,
    P2sh,
    P2tr,
    /// `M`-of-`N` bare multisig.
    P2ms { m: u8, n: u8 },
    OpReturn,
    WitnessCommitment,
    NonStandard,
}

fn op_n_value(byte: u8) -> Option<u8> {
    match byte {
        0x51..=0x60 => Some(byte - 0x50),
        _ => None,
    }
}

/// Classify `script` into a [`Pattern`] by inspecting its element sequence.
pub fn classify(script: &Script) -> Pattern {
    let e = &script.elements;

    match e.len() {
        5 if e[0].is_opcode(Opcode::Dup)
            && e[1].is_opcode(Opcode::Hash160)
            && e[2].data_len(20)
            && e[3].is_opcode(Opcode::EqualVerify)
            && e[4].is_opcode(Opcode::CheckSig) =>
        {
            Pattern::P2pkh
        }
        2 if (e[0].data_len(33) || e[0].data_len(65)) && e[1].is_opcode(Opcode::CheckSig) => {
            Pattern::P2pk
        }
        2 if e[0].is_opcode(Opcode::Op0) && e[1].data_len(20) => Pattern::P2wpkh,
        2 if e[0].is_opcode(Opcode::Op0) && e[1].data_len(32) => Pattern::P2wsh,
        3 if e[0].is_opcode(Opcode::Hash160) && e[1].data_len(20) && e[2].is_opcode(Opcode::Equal) => {
            Pattern::P2sh
        }
        2 if e[0].is_opcode(Opcode::Op1) && e[1].data_len(32) => Pattern::P2tr,
        1 if e[0].is_opcode(Opcode::Return) => Pattern::OpReturn,
        _ => classify_multisig(e).unwrap_or(Pattern::NonStandard),
    }
}

fn classify_multisig(e: &[Element]) -> Option<Pattern> {
    if e.len() < 4 {
        return None;
    }
    let m = op_n_value(e.first()?.opcode_byte)?;
    let last = e.last()?;
    if !last.is_opcode(Opcode::CheckMultisig) {
        return None;
    }
    let n = op_n_value(e.get(e.len() - 2)?.opcode_byte)?;
    let pubkeys = &e[1..e.len() - 2];
    if pubkeys.len() != n as usize {
        return None;
    }
    if !pubkeys.iter().all(|p| p.data_len(33) || p.data_len(65)) {
        return None;
    }
    if m < 1 || m > n || n > 16 {
        return None;
    }
    Some(Pattern::P2ms { m, n })
}

/// BIP-141 witness-commitment prefix: `OP_RETURN 0x24 0xaa21a9ed <32 bytes>`.
pub const WITNESS_COMMITMENT_HEADER: [u8; 6] = [0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xed];

/// Scan raw output-script bytes for the BIP-141 witness-commitment prefix and
/// return the embedded 32-byte commitment hash if present. Operates on raw
/// bytes (not the element model) because the header spans the OP_RETURN
/// opcode and a 0x24-length push that the element parser already separates.
pub fn extract_witness_commitment(script_bytes: &[u8]) -> Option<[u8; 32]> {
    if script_bytes.len() < WITNESS_COMMITMENT_HEADER.len() + 32 {
        return None;
    }
    if &script_bytes[0..6] != WITNESS_COMMITMENT_HEADER.as_slice() {
        return None;
    }
    script_bytes[6..38].try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        if bytes.len() <= 0x4b {
            out.push(bytes.len() as u8);
        } else {
            out.push(Opcode::PushData1 as u8);
            out.push(bytes.len() as u8);
        }
        out.extend_from_slice(bytes);
        out
    }

    #[test]
    fn parses_p2pkh_pattern() {
        let pubkey_hash = [0x11u8; 20];
        let mut bytes = vec![Opcode::Dup as u8, Opcode::Hash160 as u8];
        bytes.extend(push(&pubkey_hash));
        bytes.push(Opcode::EqualVerify as u8);
        bytes.push(Opcode::CheckSig as u8);

        let script = Script::parse(&bytes);
        assert_eq!(script.elements.len(), 5);
        assert_eq!(classify(&script), Pattern::P2pkh);
    }

    #[test]
    fn parses_p2wpkh_and_p2wsh() {
        let mut wpkh = vec![Opcode::Op0 as u8];
        wpkh.extend(push(&[0u8; 20]));
        assert_eq!(classify(&Script::parse(&wpkh)), Pattern::P2wpkh);

        let mut wsh = vec![Opcode::Op0 as u8];
        wsh.extend(push(&[0u8; 32]));
        assert_eq!(classify(&Script::parse(&wsh)), Pattern::P2wsh);
    }

    #[test]
    fn parses_p2tr_and_p2sh() {
        let mut p2tr = vec![Opcode::Op1 as u8];
        p2tr.extend(push(&[0u8; 32]));
        assert_eq!(classify(&Script::parse(&p2tr)), Pattern::P2tr);

        let mut p2sh = vec![Opcode::Hash160 as u8];
        p2sh.extend(push(&[0u8; 20]));
        p2sh.push(Opcode::Equal as u8);
        assert_eq!(classify(&Script::parse(&p2sh)), Pattern::P2sh);
    }

    #[test]
    fn parses_1_of_2_multisig() {
        let mut bytes = vec![Opcode::Op1 as u8];
        bytes.extend(push(&[0x02; 33]));
        bytes.extend(push(&[0x03; 33]));
        bytes.push(0x52); // OP_2
        bytes.push(Opcode::CheckMultisig as u8);
        let script = Script::parse(&bytes);
        assert_eq!(classify(&script), Pattern::P2ms { m: 1, n: 2 });
    }

    #[test]
    fn malformed_push_is_kept_not_rejected() {
        // PUSHDATA1 claiming 10 bytes but only 2 remain.
        let bytes = vec![Opcode::PushData1 as u8, 10, 0xaa, 0xbb];
        let script = Script::parse(&bytes);
        assert_eq!(script.elements.len(), 1);
        assert!(script.elements[0].invalid);
        assert_eq!(script.elements[0].data.as_deref(), Some(&[0xaa, 0xbb][..]));
    }

    #[test]
    fn extracts_witness_commitment() {
        let mut bytes = WITNESS_COMMITMENT_HEADER.to_vec();
        bytes.extend_from_slice(&[0x42u8; 32]);
        assert_eq!(extract_witness_commitment(&bytes), Some([0x42u8; 32]));
        assert_eq!(extract_witness_commitment(&[0u8; 10]), None);
    }
}
