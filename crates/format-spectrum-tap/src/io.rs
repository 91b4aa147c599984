//! Little-endian helpers over `std::io`.

use std::io::{self, Read, Write};

pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16_le<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Append one TAP record: length word, flag, data and XOR checksum.
pub fn write_block<W: Write>(writer: &mut W, flag: u8, data: &[u8]) -> io::Result<()> {
    let len = u16::try_from(data.len() + 2)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "TAP block too long"))?;
    let checksum = data.iter().fold(flag, |acc, &b| acc ^ b);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&[flag])?;
    writer.write_all(data)?;
    writer.write_all(&[checksum])
}
