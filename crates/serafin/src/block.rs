//! Fortran unformatted sequential record framing
//!
//! Every logical block in the file is `<length> <content> <length>`, with the
//! length as a 4 byte integer in the file byte order. All reads and writes of
//! framed content go through here so the marker checks live in one place.

// standard library
use std::io::{Read, Write};

// crate modules
use crate::encoding::Encoding;
use crate::error::{Error, Result};

// slftools modules
use slftools_format::f;

/// Size of a record length marker
pub(crate) const MARKER: usize = 4;

/// Size on disk of a block with `content` bytes once framed
pub(crate) fn framed(content: usize) -> usize {
    content + 2 * MARKER
}

/// Read one length marker
pub(crate) fn read_marker<R: Read>(reader: &mut R, encoding: &Encoding) -> Result<usize> {
    let mut buffer = [0u8; MARKER];
    reader.read_exact(&mut buffer)?;
    let length = encoding.int(buffer);
    usize::try_from(length)
        .map_err(|_| Error::CorruptFile(f!("negative record length {length}")))
}

/// Read the closing marker and make sure it matches the opening one
fn check_closing_marker<R: Read>(reader: &mut R, encoding: &Encoding, length: usize) -> Result<()> {
    let closing = read_marker(reader, encoding)?;
    if closing != length {
        return Err(Error::UnexpectedByteLength {
            expected: length as i64,
            found: closing as i64,
        });
    }
    Ok(())
}

/// Read the content of a block of a known length
pub(crate) fn read_block_exact<R: Read>(
    reader: &mut R,
    encoding: &Encoding,
    expected: usize,
) -> Result<Vec<u8>> {
    let length = read_marker(reader, encoding)?;
    if length != expected {
        return Err(Error::UnexpectedByteLength {
            expected: expected as i64,
            found: length as i64,
        });
    }
    read_content(reader, encoding, length)
}

/// Read the content of a block once the opening marker has been consumed
pub(crate) fn read_content<R: Read>(
    reader: &mut R,
    encoding: &Encoding,
    length: usize,
) -> Result<Vec<u8>> {
    let mut content = vec![0u8; length];
    reader.read_exact(&mut content)?;
    check_closing_marker(reader, encoding, length)?;
    Ok(content)
}

/// Write one length marker
pub(crate) fn write_marker<W: Write>(writer: &mut W, encoding: &Encoding, length: usize) -> Result<()> {
    let length = i32::try_from(length).map_err(|_| {
        Error::InconsistentHeader(f!("block of {length} bytes exceeds the record limit"))
    })?;
    writer.write_all(&encoding.int_bytes(length))?;
    Ok(())
}

/// Write a complete block from its content
pub(crate) fn write_block<W: Write>(writer: &mut W, encoding: &Encoding, content: &[u8]) -> Result<()> {
    write_marker(writer, encoding, content.len())?;
    writer.write_all(content)?;
    write_marker(writer, encoding, content.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{ByteOrder, FloatWidth};
    use std::io::Cursor;

    fn big() -> Encoding {
        Encoding::new(ByteOrder::Big, FloatWidth::Single)
    }

    #[test]
    fn framed_block_is_read_back() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, &big(), b"abcd").unwrap();
        assert_eq!(bytes.len(), framed(4));

        let content = read_block_exact(&mut Cursor::new(bytes), &big(), 4).unwrap();
        assert_eq!(content, b"abcd");
    }

    #[test]
    fn mismatched_closing_marker() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4i32.to_be_bytes());
        bytes.extend_from_slice(b"abcd");
        bytes.extend_from_slice(&5i32.to_be_bytes());

        let result = read_block_exact(&mut Cursor::new(bytes), &big(), 4);
        assert!(matches!(
            result,
            Err(Error::UnexpectedByteLength {
                expected: 4,
                found: 5
            })
        ));
    }

    #[test]
    fn unexpected_opening_marker() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, &big(), b"ab").unwrap();
        assert!(read_block_exact(&mut Cursor::new(bytes), &big(), 4).is_err());
    }

    #[test]
    fn negative_length_is_corrupt() {
        let bytes = (-8i32).to_be_bytes().to_vec();
        let result = read_marker(&mut Cursor::new(bytes), &big());
        assert!(matches!(result, Err(Error::CorruptFile(_))));
    }
}
