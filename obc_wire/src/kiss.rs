//! KISS byte-stuffing framing (§6): `C0 ... C0` delimited frames with
//! `C0 -> DB DC` and `DB -> DB DD` escaping.

const FEND: u8 = 0xC0;
const FESC: u8 = 0xDB;
const TFEND: u8 = 0xDC;
const TFESC: u8 = 0xDD;

/// Wraps `payload` in a KISS frame, escaping any `FEND`/`FESC` bytes it contains.
pub fn encode(payload: &[u8], out: &mut heapless::Vec<u8, 512>) -> Result<(), ()> {
    out.clear();
    out.push(FEND).map_err(|_| ())?;
    for &b in payload {
        match b {
            FEND => {
                out.push(FESC).map_err(|_| ())?;
                out.push(TFEND).map_err(|_| ())?;
            }
            FESC => {
                out.push(FESC).map_err(|_| ())?;
                out.push(TFESC).map_err(|_| ())?;
            }
            other => out.push(other).map_err(|_| ())?,
        }
    }
    out.push(FEND).map_err(|_| ())?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    MissingFend,
    TruncatedEscape,
    BadEscape,
}

/// Unwraps one KISS frame (leading/trailing `FEND` stripped, bytes unescaped).
pub fn decode(framed: &[u8], out: &mut heapless::Vec<u8, 512>) -> Result<(), DecodeError> {
    out.clear();
    let start = framed.iter().position(|&b| b == FEND).ok_or(DecodeError::MissingFend)?;
    let body = &framed[start + 1..];
    let end = body.iter().position(|&b| b == FEND).ok_or(DecodeError::MissingFend)?;
    let body = &body[..end];

    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        if b == FESC {
            let next = body.get(i + 1).ok_or(DecodeError::TruncatedEscape)?;
            match *next {
                TFEND => out.push(FEND).map_err(|_| DecodeError::BadEscape)?,
                TFESC => out.push(FESC).map_err(|_| DecodeError::BadEscape)?,
                _ => return Err(DecodeError::BadEscape),
            }
            i += 2;
        } else {
            out.push(b).map_err(|_| DecodeError::BadEscape)?;
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_arbitrary_bytes() {
        let payload = [0x01, 0xC0, 0x02, 0xDB, 0x03, 0xC0, 0xDB];
        let mut framed = heapless::Vec::<u8, 512>::new();
        encode(&payload, &mut framed).unwrap();
        assert_eq!(framed[0], FEND);
        assert_eq!(*framed.last().unwrap(), FEND);

        let mut decoded = heapless::Vec::<u8, 512>::new();
        decode(&framed, &mut decoded).unwrap();
        assert_eq!(decoded.as_slice(), &payload[..]);
    }

    #[test]
    fn roundtrips_empty_payload() {
        let mut framed = heapless::Vec::<u8, 512>::new();
        encode(&[], &mut framed).unwrap();
        let mut decoded = heapless::Vec::<u8, 512>::new();
        decode(&framed, &mut decoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn rejects_truncated_escape() {
        let framed = [FEND, FESC, FEND];
        let mut decoded = heapless::Vec::<u8, 512>::new();
        assert_eq!(decode(&framed, &mut decoded), Err(DecodeError::TruncatedEscape));
    }

    proptest::proptest! {
        #[test]
        fn prop_roundtrip(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200)) {
            let mut framed = heapless::Vec::<u8, 512>::new();
            encode(&bytes, &mut framed).unwrap();
            let mut decoded = heapless::Vec::<u8, 512>::new();
            decode(&framed, &mut decoded).unwrap();
            proptest::prop_assert_eq!(decoded.as_slice(), bytes.as_slice());
        }
    }
}
