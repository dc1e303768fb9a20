//! Bitcoin's variable-length unsigned integer encoding.

use crate::error::ParseError;

const CONTEXT: &str = "CompactSize";

/// Encode `value` in its canonical (smallest) CompactSize form.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    encode_into(value, &mut out);
    out
}

/// Append the canonical encoding of `value` to `out`.
pub fn encode_into(value: u64, out: &mut Vec<u8>) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decode a CompactSize from the front of `view`, returning the value and the
/// number of bytes consumed. Accepts non-canonical forms on the wire (a peer
/// may not send the smallest encoding); callers that care should check
/// `consumed` against [`canonical_len`].
pub fn decode(view: &[u8]) -> Result<(u64, usize), ParseError> {
    let discriminator = *view
        .first()
        .ok_or_else(|| ParseError::short(CONTEXT, 1, view.len()))?;

    match discriminator {
        0xff => {
            if view.len() < 9 {
                return Err(ParseError::short(CONTEXT, 9, view.len()));
            }
            let value = u64::from_le_bytes(view[1..9].try_into().unwrap());
            Ok((value, 9))
        }
        0xfe => {
            if view.len() < 5 {
                return Err(ParseError::short(CONTEXT, 5, view.len()));
            }
            let value = u32::from_le_bytes(view[1..5].try_into().unwrap()) as u64;
            Ok((value, 5))
        }
        0xfd => {
            if view.len() < 3 {
                return Err(ParseError::short(CONTEXT, 3, view.len()));
            }
            let value = u16::from_le_bytes(view[1..3].try_into().unwrap()) as u64;
            Ok((value, 3))
        }
        small => Ok((small as u64, 1)),
    }
}

/// Decode a CompactSize-prefixed field from `view`, enforcing that the
/// declared value (interpreted as a byte length) plus the CompactSize's own
/// length does not exceed `remaining_budget`. Returns the decoded value, the
/// view advanced past the CompactSize header, and the updated budget.
pub fn decode_prefix<'a>(
    view: &'a [u8],
    remaining_budget: usize,
) -> Result<(u64, &'a [u8], usize), ParseError> {
    let (value, consumed) = decode(view)?;
    if consumed > remaining_budget {
        return Err(ParseError::invalid(
            CONTEXT,
            "compact-size header exceeds remaining budget",
        ));
    }
    let new_budget = remaining_budget - consumed;
    let value_usize = usize::try_from(value)
        .map_err(|_| ParseError::invalid(CONTEXT, "value does not fit in usize"))?;
    if value_usize > new_budget {
        return Err(ParseError::invalid(
            CONTEXT,
            "declared length exceeds remaining budget",
        ));
    }
    Ok((value, &view[consumed..], new_budget))
}

/// The number of bytes the canonical encoding of `value` occupies.
pub fn canonical_len(value: u64) -> usize {
    if value < 0xfd {
        1
    } else if value <= 0xffff {
        3
    } else if value <= 0xffff_ffff {
        5
    } else {
        9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_minimal_forms() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(252), vec![0xfc]);
        assert_eq!(encode(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(
            encode(0x1_0000_0000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn round_trips_each_discriminator_boundary() {
        for v in [0u64, 1, 252, 253, 0xffff, 0x10000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let encoded = encode(v);
            let (decoded, consumed) = decode(&encoded).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, encoded.len());
            assert_eq!(consumed, canonical_len(v));
        }
    }

    #[test]
    fn decode_accepts_non_canonical_9_byte_form_for_small_value() {
        let mut bytes = vec![0xff];
        bytes.extend_from_slice(&5u64.to_le_bytes());
        let (value, consumed) = decode(&bytes).unwrap();
        assert_eq!(value, 5);
        assert_eq!(consumed, 9);
    }

    #[test]
    fn decode_fails_on_truncated_input() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0xfd, 0x01]).is_err());
        assert!(decode(&[0xff, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn decode_prefix_rejects_over_budget_declared_length() {
        let mut bytes = encode(10);
        bytes.extend_from_slice(&[0u8; 5]);
        assert!(decode_prefix(&bytes, 6).is_err());
        let (value, rest, budget) = decode_prefix(&encode(3), 3 + 1).unwrap();
        assert_eq!(value, 3);
        assert_eq!(budget, 1);
        assert!(rest.is_empty());
    }
}
