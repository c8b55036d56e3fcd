//! Scoped file reads and bounds-checked byte access.
//!
//! Every read opens its own handle and drops it before returning, on the
//! error paths too.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Buf;
use pdx_common::constants::{HEADER_HEADER_SIZE, FIELD_INFO_OFFSET};

use crate::error::{StorageError, StorageResult};

/// Reads a whole file.
pub(crate) fn read_all(path: &Path) -> StorageResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| StorageError::file_access(path, e))
}

/// Reads only the header of a Paradox file.
///
/// The header size is stored at offset 2, so the first four bytes are read
/// before the rest of the header.
pub(crate) fn read_header(path: &Path) -> StorageResult<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| StorageError::file_access(path, e))?;

    let mut prefix = [0u8; 4];
    read_exact(&mut file, &mut prefix, path, "file is too short for a header")?;

    let header_size = usize::from((&prefix[HEADER_HEADER_SIZE..]).get_u16_le());
    if header_size < FIELD_INFO_OFFSET {
        return Err(StorageError::format(
            path,
            format!("header size {header_size} is smaller than the fixed header"),
        ));
    }

    let mut header = vec![0u8; header_size];
    header[..prefix.len()].copy_from_slice(&prefix);
    read_exact(
        &mut file,
        &mut header[prefix.len()..],
        path,
        "header is truncated",
    )?;
    Ok(header)
}

fn read_exact(file: &mut File, buf: &mut [u8], path: &Path, short: &str) -> StorageResult<()> {
    file.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StorageError::format(path, short)
        } else {
            StorageError::file_access(path, e)
        }
    })
}

/// Returns `len` bytes at `offset`, or a Format error naming `what`.
pub(crate) fn slice<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    path: &Path,
    what: &str,
) -> StorageResult<&'a [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            StorageError::format(
                path,
                format!(
                    "{what} at offset {offset:#x} (+{len}) lies beyond {} bytes",
                    data.len()
                ),
            )
        })
}

pub(crate) fn u8_at(data: &[u8], offset: usize, path: &Path, what: &str) -> StorageResult<u8> {
    Ok(slice(data, offset, 1, path, what)?.get_u8())
}

pub(crate) fn u16_at(data: &[u8], offset: usize, path: &Path, what: &str) -> StorageResult<u16> {
    Ok(slice(data, offset, 2, path, what)?.get_u16_le())
}

pub(crate) fn u32_at(data: &[u8], offset: usize, path: &Path, what: &str) -> StorageResult<u32> {
    Ok(slice(data, offset, 4, path, what)?.get_u32_le())
}

/// Reads a NUL-terminated string starting at `offset`.
///
/// Returns the string and the offset just past its terminator.
pub(crate) fn cstr_at(
    data: &[u8],
    offset: usize,
    path: &Path,
    what: &str,
) -> StorageResult<(String, usize)> {
    let rest = data.get(offset..).unwrap_or_default();
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StorageError::format(path, format!("{what} is not terminated")))?;
    Ok((latin1(&rest[..len]), offset + len + 1))
}

/// Lists files next to `path` that share its stem, ignoring case.
///
/// Returns `(path, extension)` pairs sorted by file name, without `path`
/// itself.
pub(crate) fn companions(path: &Path) -> StorageResult<Vec<(PathBuf, String)>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(Vec::new());
    };
    let own_name = path.file_name();

    let mut found: Vec<(PathBuf, String)> = std::fs::read_dir(dir)
        .map_err(|e| StorageError::file_access(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_name() != own_name)
        .filter_map(|p| {
            let candidate = p.file_stem()?.to_str()?;
            if !candidate.eq_ignore_ascii_case(stem) {
                return None;
            }
            let ext = p.extension()?.to_str()?.to_string();
            Some((p, ext))
        })
        .collect();

    found.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(found)
}

/// Decodes ISO-8859-1 bytes.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> PathBuf {
        PathBuf::from("t.db")
    }

    #[test]
    fn test_slice_bounds() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(slice(&data, 1, 2, &p(), "x").unwrap(), &[2, 3]);
        assert!(slice(&data, 3, 2, &p(), "x").is_err());
        assert!(slice(&data, usize::MAX, 2, &p(), "x").is_err());
    }

    #[test]
    fn test_little_endian_getters() {
        let data = [0x34u8, 0x12, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(u16_at(&data, 0, &p(), "x").unwrap(), 0x1234);
        assert_eq!(u32_at(&data, 2, &p(), "x").unwrap(), 0x1234_5678);
        assert_eq!(u8_at(&data, 5, &p(), "x").unwrap(), 0x12);
    }

    #[test]
    fn test_cstr() {
        let data = b"Name\0City\0";
        let (first, next) = cstr_at(data, 0, &p(), "name").unwrap();
        assert_eq!(first, "Name");
        let (second, end) = cstr_at(data, next, &p(), "name").unwrap();
        assert_eq!(second, "City");
        assert_eq!(end, data.len());
        assert!(cstr_at(b"open", 0, &p(), "name").is_err());
    }

    #[test]
    fn test_latin1() {
        assert_eq!(latin1(&[0x53, 0xE3, 0x6F]), "S\u{e3}o");
    }

    #[test]
    fn test_companions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["CUSTOMER.DB", "CUSTOMER.PX", "customer.x06", "CUSTOMER.MB", "ORDERS.DB"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = companions(&dir.path().join("CUSTOMER.DB")).unwrap();
        let exts: Vec<_> = found.iter().map(|(_, ext)| ext.as_str()).collect();
        assert_eq!(exts, ["MB", "PX", "x06"]);
    }

    #[test]
    fn test_read_header_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_header(&dir.path().join("none.db")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_header_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.db");
        std::fs::write(&path, [0u8, 1]).unwrap();
        assert!(read_header(&path).unwrap_err().is_format());

        // declares a 0x800 header but holds only 0x60 bytes
        let mut bytes = vec![0u8; 0x60];
        bytes[2] = 0x00;
        bytes[3] = 0x08;
        std::fs::write(&path, &bytes).unwrap();
        assert!(read_header(&path).unwrap_err().is_format());
    }
}
