use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use crate::errors::UnpackError;

pub fn read_file(mut file: &File, offset: u64, size: usize) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; size];
    file.read_exact(&mut buffer)?;

    // reset seek (!
    file.seek(SeekFrom::Start(offset))?;
    Ok(buffer)
}

pub fn read_exact<R: Read>(reader: &mut R, size: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn string_from_bytes(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

pub fn read_u32<R: Read>(reader: &mut R, field: &str) -> Result<u32, UnpackError> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|_| UnpackError::truncated(field))?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn read_u64<R: Read>(reader: &mut R, field: &str) -> Result<u64, UnpackError> {
    let mut bytes = [0u8; 8];
    reader
        .read_exact(&mut bytes)
        .map_err(|_| UnpackError::truncated(field))?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn read_string<R: Read>(reader: &mut R, size: usize, field: &str) -> Result<String, UnpackError> {
    let bytes = read_exact(reader, size).map_err(|_| UnpackError::truncated(field))?;
    Ok(string_from_bytes(&bytes))
}

// reads rather than seeks so truncation inside the region still names the field
pub fn skip<R: Read>(reader: &mut R, size: usize, field: &str) -> Result<(), UnpackError> {
    read_exact(reader, size).map_err(|_| UnpackError::truncated(field))?;
    Ok(())
}

// a zero page size reports zero pages instead of dividing by it
pub fn number_of_pages(image_size: u32, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    image_size.div_ceil(page_size)
}
