// adapters/pkcs12/ber.rs
//! BER to DER re-encoding. Archives exported by Windows and Java tooling use
//! indefinite lengths and segmented OCTET STRINGs, which the `der` walk
//! rejects. Definite lengths are re-emitted in minimal form and constructed
//! universal strings are joined into their primitive form.

use std::borrow::Cow;

use crate::domain::error::{DecodeError, DecodeResult};

const MAX_DEPTH: usize = 64;
const CONSTRUCTED: u8 = 0x20;

/// DER encoding of the single BER value in `input`. Input that is already
/// DER comes back borrowed.
pub fn to_der(input: &[u8]) -> DecodeResult<Cow<'_, [u8]>> {
  let mut out = Vec::with_capacity(input.len());
  let used = reencode(input, 0, &mut out)?;
  if used != input.len() {
    return Err(DecodeError::malformed("trailing data after BER value"));
  }
  if out == input {
    Ok(Cow::Borrowed(input))
  } else {
    Ok(Cow::Owned(out))
  }
}

/// Re-encode one TLV from the front of `input`; returns the bytes consumed.
fn reencode(input: &[u8], depth: usize, out: &mut Vec<u8>) -> DecodeResult<usize> {
  if depth > MAX_DEPTH {
    return Err(DecodeError::malformed("BER nesting too deep"));
  }
  let id_len = identifier_len(input)?;
  let (length, len_len) = read_length(&input[id_len..])?;
  let mut pos = id_len + len_len;
  let first = input[0];

  if first & CONSTRUCTED == 0 {
    let len = length.ok_or_else(|| DecodeError::malformed("indefinite length on a primitive value"))?;
    let end = content_end(input, pos, len)?;
    out.extend_from_slice(&input[..id_len]);
    push_length(out, len);
    out.extend_from_slice(&input[pos..end]);
    return Ok(end);
  }

  let mut body = Vec::new();
  match length {
    Some(len) => {
      let end = content_end(input, pos, len)?;
      while pos < end {
        pos += reencode(&input[pos..end], depth + 1, &mut body)?;
      }
    }
    None => loop {
      let rest = &input[pos..];
      if rest.len() < 2 {
        return Err(truncated());
      }
      if rest[..2] == [0, 0] {
        pos += 2;
        break;
      }
      pos += reencode(rest, depth + 1, &mut body)?;
    },
  }

  if is_segmented_string(first) {
    let joined = join_segments(&body)?;
    out.push(first & !CONSTRUCTED);
    push_length(out, joined.len());
    out.extend_from_slice(&joined);
  } else {
    out.extend_from_slice(&input[..id_len]);
    push_length(out, body.len());
    out.extend_from_slice(&body);
  }
  Ok(pos)
}

fn identifier_len(input: &[u8]) -> DecodeResult<usize> {
  let first = *input.first().ok_or_else(truncated)?;
  if first & 0x1f != 0x1f {
    return Ok(1);
  }
  // high tag number form
  for (i, b) in input.iter().enumerate().skip(1).take(4) {
    if b & 0x80 == 0 {
      return Ok(i + 1);
    }
  }
  Err(DecodeError::malformed("BER tag number too large"))
}

/// Length octets: `None` for the indefinite form.
fn read_length(input: &[u8]) -> DecodeResult<(Option<usize>, usize)> {
  let first = *input.first().ok_or_else(truncated)?;
  match first {
    0x80 => Ok((None, 1)),
    n if n < 0x80 => Ok((Some(usize::from(n)), 1)),
    n => {
      let count = usize::from(n & 0x7f);
      if count > 4 {
        return Err(DecodeError::malformed("BER length too large"));
      }
      let octets = input.get(1..=count).ok_or_else(truncated)?;
      let len = octets.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
      Ok((Some(len), count + 1))
    }
  }
}

fn push_length(out: &mut Vec<u8>, len: usize) {
  if len < 0x80 {
    out.push(len as u8);
    return;
  }
  let bytes = len.to_be_bytes();
  let skip = bytes.iter().take_while(|b| **b == 0).count();
  out.push(0x80 | (bytes.len() - skip) as u8);
  out.extend_from_slice(&bytes[skip..]);
}

fn content_end(input: &[u8], start: usize, len: usize) -> DecodeResult<usize> {
  start
    .checked_add(len)
    .filter(|end| *end <= input.len())
    .ok_or_else(truncated)
}

/// Constructed universal OCTET STRING or character string.
fn is_segmented_string(first: u8) -> bool {
  first & 0xc0 == 0 && matches!(first & 0x1f, 4 | 12 | 18..=22 | 25..=30)
}

/// Concatenate the contents of already re-encoded primitive segments.
fn join_segments(body: &[u8]) -> DecodeResult<Vec<u8>> {
  let mut joined = Vec::with_capacity(body.len());
  let mut pos = 0;
  while pos < body.len() {
    let seg = &body[pos..];
    if seg[0] & CONSTRUCTED != 0 || seg[0] & 0x1f == 0x1f {
      return Err(DecodeError::malformed("unexpected segment in constructed string"));
    }
    let (length, len_len) = read_length(&seg[1..])?;
    let len = length.ok_or_else(truncated)?;
    let start = 1 + len_len;
    let end = content_end(seg, start, len)?;
    joined.extend_from_slice(&seg[start..end]);
    pos += end;
  }
  Ok(joined)
}

fn truncated() -> DecodeError {
  DecodeError::malformed("truncated BER value")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn der_passes_through_borrowed() {
    let der = [0x30, 0x06, 0x02, 0x01, 0x03, 0x04, 0x01, 0xaa];
    assert!(matches!(to_der(&der).unwrap(), Cow::Borrowed(_)));
  }

  #[test]
  fn indefinite_sequence_becomes_definite() {
    let ber = [0x30, 0x80, 0x02, 0x01, 0x03, 0x30, 0x80, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00];
    let der = to_der(&ber).unwrap();
    assert_eq!(&der[..], &[0x30, 0x07, 0x02, 0x01, 0x03, 0x30, 0x02, 0x05, 0x00]);
  }

  #[test]
  fn segmented_octet_string_is_joined() {
    // [0] EXPLICIT { OCTET STRING constructed { "ab", "c" } }
    let ber = [
      0xa0, 0x80, 0x24, 0x80, 0x04, 0x02, b'a', b'b', 0x04, 0x01, b'c', 0x00, 0x00, 0x00, 0x00,
    ];
    let der = to_der(&ber).unwrap();
    assert_eq!(&der[..], &[0xa0, 0x05, 0x04, 0x03, b'a', b'b', b'c']);
  }

  #[test]
  fn long_form_lengths_are_minimised() {
    let ber = [0x04, 0x82, 0x00, 0x02, 0x01, 0x02];
    assert_eq!(&to_der(&ber).unwrap()[..], &[0x04, 0x02, 0x01, 0x02]);

    let mut big = vec![0x04, 0x81, 0x90];
    big.extend(std::iter::repeat(7u8).take(0x90));
    let der = to_der(&big).unwrap();
    assert_eq!(&der[..3], &[0x04, 0x81, 0x90]);
    assert_eq!(der.len(), big.len());
  }

  #[test]
  fn rejects_broken_input() {
    for bad in [
      &[][..],
      &[0x30, 0x80, 0x05, 0x00][..],
      &[0x04, 0x80, 0x00, 0x00][..],
      &[0x04, 0x05, 0x01][..],
      &[0x30, 0x00, 0x00][..],
    ] {
      assert!(matches!(to_der(bad), Err(DecodeError::MalformedContainer(_))), "{bad:02x?}");
    }
  }

  #[test]
  fn deep_nesting_is_bounded() {
    let mut ber = Vec::new();
    for _ in 0..(MAX_DEPTH + 2) {
      ber.extend_from_slice(&[0x30, 0x80]);
    }
    for _ in 0..(MAX_DEPTH + 2) {
      ber.extend_from_slice(&[0x00, 0x00]);
    }
    assert!(matches!(to_der(&ber), Err(DecodeError::MalformedContainer(_))));
  }
}
