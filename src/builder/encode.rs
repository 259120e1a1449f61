//! MMDB data section encoding.
//!
//! Every value starts with a control byte: type in the top three bits, size
//! in the low five. Types above 7 set the type bits to zero and store
//! `type - 7` in the following byte. Sizes of 29 and above spill into one to
//! three extra bytes.

/// Field type identifiers.
const TYPE_STRING: u8 = 2;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;
const TYPE_UINT64: u8 = 9;
const TYPE_ARRAY: u8 = 11;

/// A value that can be stored in the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    /// Key order is preserved as given
    Map(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    /// Append the encoded form of `self` to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::String(s) => {
                write_control(out, TYPE_STRING, s.len());
                out.extend_from_slice(s.as_bytes());
            }
            Value::Uint16(v) => write_uint(out, TYPE_UINT16, &v.to_be_bytes()),
            Value::Uint32(v) => write_uint(out, TYPE_UINT32, &v.to_be_bytes()),
            Value::Uint64(v) => write_uint(out, TYPE_UINT64, &v.to_be_bytes()),
            Value::Map(entries) => {
                write_control(out, TYPE_MAP, entries.len());
                for (key, value) in entries {
                    write_control(out, TYPE_STRING, key.len());
                    out.extend_from_slice(key.as_bytes());
                    value.encode(out);
                }
            }
            Value::Array(items) => {
                write_control(out, TYPE_ARRAY, items.len());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Unsigned integers are stored big-endian without leading zero bytes.
fn write_uint(out: &mut Vec<u8>, type_id: u8, be_bytes: &[u8]) {
    let start = be_bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(be_bytes.len());
    let significant = &be_bytes[start..];
    write_control(out, type_id, significant.len());
    out.extend_from_slice(significant);
}

fn write_control(out: &mut Vec<u8>, type_id: u8, size: usize) {
    let (type_bits, extended) = if type_id <= 7 {
        (type_id << 5, None)
    } else {
        (0, Some(type_id - 7))
    };

    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, Vec::new())
    } else if size < 29 + 256 {
        (29, vec![(size - 29) as u8])
    } else if size < 285 + 65_536 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else {
        let rest = (size - 65_821) as u32;
        (31, rest.to_be_bytes()[1..].to_vec())
    };

    out.push(type_bits | size_bits);
    if let Some(ext) = extended {
        out.push(ext);
    }
    out.extend_from_slice(&extra);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_string() {
        assert_eq!(
            Value::String("AS".to_string()).to_bytes(),
            vec![0x42, b'A', b'S']
        );
    }

    #[test]
    fn test_string_size_spill() {
        let bytes = Value::String("x".repeat(100)).to_bytes();
        assert_eq!(bytes[0], 0x40 | 29);
        assert_eq!(bytes[1], 100 - 29);
        assert_eq!(bytes.len(), 2 + 100);

        let bytes = Value::String("x".repeat(1000)).to_bytes();
        assert_eq!(bytes[0], 0x40 | 30);
        assert_eq!(u16::from_be_bytes([bytes[1], bytes[2]]), 1000 - 285);
    }

    #[test]
    fn test_uint_minimal_width() {
        assert_eq!(Value::Uint32(0).to_bytes(), vec![0xc0]);
        assert_eq!(Value::Uint32(0x2a).to_bytes(), vec![0xc1, 0x2a]);
        assert_eq!(
            Value::Uint32(4242420000).to_bytes(),
            vec![0xc4, 0xfc, 0xde, 0x31, 0x20]
        );
        assert_eq!(Value::Uint16(24).to_bytes(), vec![0xa1, 24]);
    }

    #[test]
    fn test_extended_types() {
        // uint64: type 9 -> control type bits 0, extended byte 2
        assert_eq!(Value::Uint64(1).to_bytes(), vec![0x01, 0x02, 0x01]);
        // array: type 11 -> extended byte 4
        assert_eq!(
            Value::Array(vec![Value::String("en".to_string())]).to_bytes(),
            vec![0x01, 0x04, 0x42, b'e', b'n']
        );
    }

    #[test]
    fn test_map() {
        let map = Value::Map(vec![("a".to_string(), Value::Uint16(1))]);
        assert_eq!(map.to_bytes(), vec![0xe1, 0x41, b'a', 0xa1, 0x01]);
    }
}
