//! Self-describing datum encoding.
//!
//! Every encoded datum starts with a flag byte naming its kind. Two
//! encodings share the flag space:
//!
//! - **key** encoding ([`encode_key`]) is memcomparable: comparing encoded
//!   bytes gives the same order as comparing the values, so composite index
//!   keys sort by their columns left to right.
//! - **value** encoding ([`encode_value`]) is used inside row payloads and
//!   trades order for compactness on byte strings.
//!
//! [`decode_one`] reads either.

use crate::error::{TableError, TableResult};
use crate::types::Datum;

/// NULL. Sorts before every other value.
pub const NIL_FLAG: u8 = 0;
/// Escaped, terminated byte string (key encoding).
pub const BYTES_FLAG: u8 = 1;
/// Length-prefixed byte string (value encoding).
pub const COMPACT_BYTES_FLAG: u8 = 2;
/// Sign-flipped big-endian `i64`.
pub const INT_FLAG: u8 = 3;
/// Big-endian `u64`.
pub const UINT_FLAG: u8 = 4;
/// Order-preserving `f64` bits.
pub const FLOAT_FLAG: u8 = 5;
/// Sign-flipped big-endian `i128` followed by the scale.
pub const DECIMAL_FLAG: u8 = 6;
/// Sign-flipped big-endian nanoseconds.
pub const DURATION_FLAG: u8 = 7;
/// Sign-flipped big-endian microseconds since the epoch.
pub const TIME_FLAG: u8 = 8;

const SIGN_MASK: u64 = 0x8000_0000_0000_0000;
const SIGN_MASK_128: u128 = 1 << 127;

/// Escape byte following a literal `0x00` inside a key-encoded byte string.
const BYTES_ESCAPE: u8 = 0xFF;
/// Marker following `0x00` at the end of a key-encoded byte string.
const BYTES_END: u8 = 0x01;

/// Appends the comparable encoding of `v` without a flag.
#[inline]
pub fn encode_int(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&((v as u64) ^ SIGN_MASK).to_be_bytes());
}

/// Reads a comparable `i64` written by [`encode_int`], returning the rest.
pub fn decode_int(buf: &[u8]) -> TableResult<(i64, &[u8])> {
    let (head, rest) = split(buf, 8, "int")?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(head);
    Ok(((u64::from_be_bytes(raw) ^ SIGN_MASK) as i64, rest))
}

fn split<'a>(buf: &'a [u8], n: usize, what: &str) -> TableResult<(&'a [u8], &'a [u8])> {
    if buf.len() < n {
        return Err(TableError::codec(format!(
            "insufficient bytes to decode {what}: need {n}, have {}",
            buf.len()
        )));
    }
    Ok(buf.split_at(n))
}

fn read_u64<'a>(buf: &'a [u8], what: &str) -> TableResult<(u64, &'a [u8])> {
    let (head, rest) = split(buf, 8, what)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(head);
    Ok((u64::from_be_bytes(raw), rest))
}

fn encode_float(buf: &mut Vec<u8>, f: f64) {
    let bits = f.to_bits();
    let mapped = if bits & SIGN_MASK != 0 {
        !bits
    } else {
        bits ^ SIGN_MASK
    };
    buf.extend_from_slice(&mapped.to_be_bytes());
}

fn decode_float(mapped: u64) -> f64 {
    let bits = if mapped & SIGN_MASK != 0 {
        mapped ^ SIGN_MASK
    } else {
        !mapped
    };
    f64::from_bits(bits)
}

fn encode_bytes_comparable(buf: &mut Vec<u8>, data: &[u8]) {
    for &b in data {
        if b == 0 {
            buf.extend_from_slice(&[0x00, BYTES_ESCAPE]);
        } else {
            buf.push(b);
        }
    }
    buf.extend_from_slice(&[0x00, BYTES_END]);
}

fn decode_bytes_comparable(buf: &[u8]) -> TableResult<(Vec<u8>, &[u8])> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < buf.len() {
        if buf[i] != 0 {
            out.push(buf[i]);
            i += 1;
            continue;
        }
        match buf.get(i + 1) {
            Some(&BYTES_ESCAPE) => {
                out.push(0);
                i += 2;
            }
            Some(&BYTES_END) => return Ok((out, &buf[i + 2..])),
            other => {
                return Err(TableError::codec(format!(
                    "invalid byte string marker {other:?}"
                )))
            }
        }
    }
    Err(TableError::codec("unterminated byte string"))
}

/// Appends `datum`, delegating byte strings to `write_bytes` since the two
/// encodings differ only there.
fn encode_with<F>(buf: &mut Vec<u8>, datum: &Datum, write_bytes: F)
where
    F: FnOnce(&mut Vec<u8>, &[u8]),
{
    match datum {
        Datum::Null => buf.push(NIL_FLAG),
        Datum::Int(i) => {
            buf.push(INT_FLAG);
            encode_int(buf, *i);
        }
        Datum::Uint(u) => {
            buf.push(UINT_FLAG);
            buf.extend_from_slice(&u.to_be_bytes());
        }
        Datum::Float(f) => {
            buf.push(FLOAT_FLAG);
            encode_float(buf, *f);
        }
        Datum::Decimal { value, scale } => {
            buf.push(DECIMAL_FLAG);
            buf.extend_from_slice(&((*value as u128) ^ SIGN_MASK_128).to_be_bytes());
            buf.push(*scale);
        }
        Datum::Time(us) => {
            buf.push(TIME_FLAG);
            encode_int(buf, *us);
        }
        Datum::Duration(ns) => {
            buf.push(DURATION_FLAG);
            encode_int(buf, *ns);
        }
        Datum::Bytes(b) => write_bytes(buf, b),
    }
}

/// Appends the memcomparable encoding of each datum.
///
/// Decimals compare correctly only among values of the same scale, which
/// holds for the values of one column.
pub fn encode_key(buf: &mut Vec<u8>, datums: &[Datum]) {
    for datum in datums {
        encode_with(buf, datum, |buf, b| {
            buf.push(BYTES_FLAG);
            encode_bytes_comparable(buf, b);
        });
    }
}

/// Appends the compact encoding of each datum.
pub fn encode_value(buf: &mut Vec<u8>, datums: &[Datum]) -> TableResult<()> {
    for datum in datums {
        let len = match datum {
            Datum::Bytes(b) => u32::try_from(b.len()).map_err(|_| {
                TableError::codec(format!("byte string of {} bytes is too long", b.len()))
            })?,
            _ => 0,
        };
        encode_with(buf, datum, |buf, b| {
            buf.push(COMPACT_BYTES_FLAG);
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(b);
        });
    }
    Ok(())
}

/// Decodes one datum in either encoding, returning the rest of the buffer.
pub fn decode_one(buf: &[u8]) -> TableResult<(Datum, &[u8])> {
    let (&flag, rest) = buf
        .split_first()
        .ok_or_else(|| TableError::codec("insufficient bytes to decode value"))?;

    match flag {
        NIL_FLAG => Ok((Datum::Null, rest)),
        INT_FLAG => {
            let (v, rest) = decode_int(rest)?;
            Ok((Datum::Int(v), rest))
        }
        UINT_FLAG => {
            let (v, rest) = read_u64(rest, "uint")?;
            Ok((Datum::Uint(v), rest))
        }
        FLOAT_FLAG => {
            let (v, rest) = read_u64(rest, "float")?;
            Ok((Datum::Float(decode_float(v)), rest))
        }
        DECIMAL_FLAG => {
            let (head, rest) = split(rest, 17, "decimal")?;
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&head[..16]);
            let value = (u128::from_be_bytes(raw) ^ SIGN_MASK_128) as i128;
            Ok((
                Datum::Decimal {
                    value,
                    scale: head[16],
                },
                rest,
            ))
        }
        TIME_FLAG => {
            let (v, rest) = decode_int(rest)?;
            Ok((Datum::Time(v), rest))
        }
        DURATION_FLAG => {
            let (v, rest) = decode_int(rest)?;
            Ok((Datum::Duration(v), rest))
        }
        BYTES_FLAG => {
            let (v, rest) = decode_bytes_comparable(rest)?;
            Ok((Datum::Bytes(v), rest))
        }
        COMPACT_BYTES_FLAG => {
            let (head, rest) = split(rest, 4, "byte string length")?;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(head);
            let len = u32::from_be_bytes(raw) as usize;
            let (data, rest) = split(rest, len, "byte string")?;
            Ok((Datum::Bytes(data.to_vec()), rest))
        }
        other => Err(TableError::codec(format!("invalid encoded key flag {other}"))),
    }
}

/// Decodes every datum in `buf`.
pub fn decode(mut buf: &[u8]) -> TableResult<Vec<Datum>> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        let (datum, rest) = decode_one(buf)?;
        out.push(datum);
        buf = rest;
    }
    Ok(out)
}

/// Returns the memcomparable encoding of `datums` as a new buffer.
pub fn key_bytes(datums: &[Datum]) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_key(&mut buf, datums);
    buf
}

/// Returns the compact encoding of `datums` as a new buffer.
pub fn value_bytes(datums: &[Datum]) -> TableResult<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value(&mut buf, datums)?;
    Ok(buf)
}
