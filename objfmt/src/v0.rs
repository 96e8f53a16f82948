//! Legacy binary layout, all integers big-endian.
//!
//! Directory: `tag:u32 (3)` followed by records of
//! `mode:u32, id:[u8; 40] (ascii hex), name_len:i32, name:[u8; name_len]`.
//!
//! File: `tag:u32 (1), size:i64` followed by raw 20 byte block ids.
//!
//! Both loops run while a full record header is left, shorter trailing bytes
//! are padding.
use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use log::warn;

use objcore::id::{ID_HEX_LEN, ID_RAW_LEN};
use objcore::{Error, ObjectId, Result};

use crate::dirent::{DirEntry, Dirents, EntryKind, NameMode};
use crate::FileBody;

pub const FILE_TAG: u32 = 1;
pub const LINK_TAG: u32 = 2;
pub const DIR_TAG: u32 = 3;

// mode + hex id + name_len
const DIRENT_HDR_LEN: usize = 4 + ID_HEX_LEN + 4;

fn remaining(rdr: &Cursor<&[u8]>) -> usize {
    rdr.get_ref().len().saturating_sub(rdr.position() as usize)
}

fn truncated(obj_id: &ObjectId) -> impl Fn(std::io::Error) -> Error + '_ {
    move |e| Error::format(obj_id, format!("truncated: {}", e))
}

fn read_tag(rdr: &mut Cursor<&[u8]>, obj_id: &ObjectId, expect: u32) -> Result<()> {
    let tag = rdr.read_u32::<BigEndian>().map_err(truncated(obj_id))?;
    if tag != expect {
        return Err(Error::format(
            obj_id,
            format!("expected type tag {}, got {}", expect, tag),
        ));
    }
    Ok(())
}

pub fn decode_dir(data: &[u8], obj_id: &ObjectId, mode: NameMode) -> Result<Vec<DirEntry>> {
    let mut rdr = Cursor::new(data);
    read_tag(&mut rdr, obj_id, DIR_TAG)?;

    let mut dirents = Dirents::new(mode);
    while remaining(&rdr) >= DIRENT_HDR_LEN {
        let entry_mode = rdr.read_u32::<BigEndian>().map_err(truncated(obj_id))?;
        let mut hex_id = [0u8; ID_HEX_LEN];
        rdr.read_exact(&mut hex_id).map_err(truncated(obj_id))?;
        let name_len = rdr.read_i32::<BigEndian>().map_err(truncated(obj_id))?;

        if name_len < 0 || name_len as usize > remaining(&rdr) {
            return Err(Error::format(
                obj_id,
                format!(
                    "name length {} with {} bytes left",
                    name_len,
                    remaining(&rdr)
                ),
            ));
        }
        let mut name = vec![0; name_len as usize];
        rdr.read_exact(&mut name).map_err(truncated(obj_id))?;

        let kind = match EntryKind::from_mode(entry_mode) {
            Some(kind) => kind,
            None => {
                warn!(
                    "{}: skipping entry {:?} with mode {:o}",
                    obj_id,
                    String::from_utf8_lossy(&name),
                    entry_mode
                );
                continue;
            }
        };
        let id = ObjectId::from_hex(hex_id).map_err(|e| Error::format(obj_id, e.to_string()))?;

        dirents.insert(obj_id, DirEntry::new(name, kind, id))?;
    }

    Ok(dirents.into_sorted())
}

pub fn decode_file(data: &[u8], obj_id: &ObjectId) -> Result<FileBody> {
    let mut rdr = Cursor::new(data);
    read_tag(&mut rdr, obj_id, FILE_TAG)?;

    let size = rdr.read_i64::<BigEndian>().map_err(truncated(obj_id))?;
    if size < 0 {
        return Err(Error::format(obj_id, format!("negative file size {}", size)));
    }

    let mut block_ids = Vec::with_capacity(remaining(&rdr) / ID_RAW_LEN);
    while remaining(&rdr) >= ID_RAW_LEN {
        let mut raw = [0u8; ID_RAW_LEN];
        rdr.read_exact(&mut raw).map_err(truncated(obj_id))?;
        block_ids.push(ObjectId::from(raw));
    }

    Ok(FileBody {
        block_ids,
        size: size as u64,
    })
}

pub fn encode_dir(entries: &[DirEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&DIR_TAG.to_be_bytes());

    for entry in entries {
        let name_len = i32::try_from(entry.name.len()).map_err(|_| {
            Error::format(entry.id, format!("name of {} bytes is too long", entry.name.len()))
        })?;

        out.extend_from_slice(&entry.kind.mode().to_be_bytes());
        out.extend_from_slice(entry.id.to_hex().as_bytes());
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(&entry.name);
    }
    Ok(out)
}

pub fn encode_file(body: &FileBody) -> Result<Vec<u8>> {
    let size = i64::try_from(body.size)
        .map_err(|_| Error::format("file", format!("size {} does not fit the v0 layout", body.size)))?;

    let mut out = Vec::with_capacity(12 + body.block_ids.len() * ID_RAW_LEN);
    out.extend_from_slice(&FILE_TAG.to_be_bytes());
    out.extend_from_slice(&size.to_be_bytes());

    for id in &body.block_ids {
        out.extend_from_slice(id.as_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirent::UNKNOWN;

    fn id(c: char) -> ObjectId {
        ObjectId::from_hex(c.to_string().repeat(40)).unwrap()
    }

    fn record(out: &mut Vec<u8>, mode: u32, hex_id: &str, name: &[u8]) {
        out.extend_from_slice(&mode.to_be_bytes());
        out.extend_from_slice(hex_id.as_bytes());
        out.extend_from_slice(&(name.len() as i32).to_be_bytes());
        out.extend_from_slice(name);
    }

    #[test]
    fn one_file_entry() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        record(&mut data, 0o100644, &"1".repeat(40), b"x");

        let entries = decode_dir(&data, &id('a'), NameMode::Bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"x");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].id, id('1'));
        assert_eq!(entries[0].mtime, UNKNOWN);
        assert_eq!(entries[0].size, UNKNOWN);
    }

    #[test]
    fn empty_dir() {
        let data = DIR_TAG.to_be_bytes().to_vec();
        assert!(decode_dir(&data, &id('a'), NameMode::Bytes).unwrap().is_empty());
    }

    #[test]
    fn wrong_tag() {
        let data = FILE_TAG.to_be_bytes().to_vec();
        assert!(matches!(
            decode_dir(&data, &id('a'), NameMode::Bytes),
            Err(Error::ObjectFormat { .. })
        ));
        assert!(matches!(
            decode_dir(&[0, 0], &id('a'), NameMode::Bytes),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn unknown_mode_skipped() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        record(&mut data, 0o120777, &"2".repeat(40), b"link");
        record(&mut data, 0o040755, &"3".repeat(40), b"sub");

        let entries = decode_dir(&data, &id('a'), NameMode::Bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"sub");
        assert!(entries[0].is_dir());
    }

    #[test]
    fn name_overrun() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&0o100644u32.to_be_bytes());
        data.extend_from_slice("1".repeat(40).as_bytes());
        data.extend_from_slice(&100i32.to_be_bytes());
        data.extend_from_slice(b"short");

        assert!(matches!(
            decode_dir(&data, &id('a'), NameMode::Bytes),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn negative_name_len() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&0o100644u32.to_be_bytes());
        data.extend_from_slice("1".repeat(40).as_bytes());
        data.extend_from_slice(&(-1i32).to_be_bytes());

        assert!(matches!(
            decode_dir(&data, &id('a'), NameMode::Bytes),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn bad_hex_id() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        record(&mut data, 0o100644, &"g".repeat(40), b"x");

        assert!(matches!(
            decode_dir(&data, &id('a'), NameMode::Bytes),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn short_trailing_bytes_ignored() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        record(&mut data, 0o100644, &"1".repeat(40), b"x");
        data.extend_from_slice(&[0u8; 47]);

        let entries = decode_dir(&data, &id('a'), NameMode::Bytes).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn text_mode_binary_name() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        record(&mut data, 0o100644, &"1".repeat(40), &[0xc3, 0x28]);

        assert_eq!(decode_dir(&data, &id('a'), NameMode::Bytes).unwrap()[0].name, vec![0xc3, 0x28]);
        assert!(matches!(
            decode_dir(&data, &id('a'), NameMode::Text),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn file_two_blocks() {
        let mut data = FILE_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&30i64.to_be_bytes());
        data.extend_from_slice(&[0x11; 20]);
        data.extend_from_slice(&[0xab; 20]);

        let body = decode_file(&data, &id('a')).unwrap();
        assert_eq!(body.size, 30);
        assert_eq!(body.block_ids, vec![id('1'), ObjectId::from([0xab; 20])]);
        assert_eq!(body.block_ids[1].to_hex(), "ab".repeat(20));
    }

    #[test]
    fn file_trailing_padding() {
        let mut data = FILE_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&5i64.to_be_bytes());
        data.extend_from_slice(&[0x11; 20]);
        data.extend_from_slice(&[0x22; 19]);

        assert_eq!(decode_file(&data, &id('a')).unwrap().block_ids.len(), 1);
    }

    #[test]
    fn file_bad_header() {
        let mut data = DIR_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&5i64.to_be_bytes());
        assert!(matches!(decode_file(&data, &id('a')), Err(Error::ObjectFormat { .. })));

        let mut data = FILE_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(&(-5i64).to_be_bytes());
        assert!(matches!(decode_file(&data, &id('a')), Err(Error::ObjectFormat { .. })));

        let data = FILE_TAG.to_be_bytes().to_vec();
        assert!(matches!(decode_file(&data, &id('a')), Err(Error::ObjectFormat { .. })));
    }

    #[test]
    fn encoders_match_decoders() {
        let entries = vec![
            DirEntry::new("a.txt", EntryKind::File, id('1')),
            DirEntry::new("sub", EntryKind::Dir, id('2')),
        ];
        assert_eq!(
            decode_dir(&encode_dir(&entries).unwrap(), &id('a'), NameMode::Text).unwrap(),
            entries
        );

        let body = FileBody {
            block_ids: vec![id('3'), id('4')],
            size: 1234,
        };
        assert_eq!(decode_file(&encode_file(&body).unwrap(), &id('a')).unwrap(), body);
    }

    #[test]
    fn oversized_file_not_encoded() {
        let body = FileBody {
            block_ids: vec![id('3')],
            size: i64::MAX as u64 + 1,
        };
        assert!(matches!(encode_file(&body), Err(Error::ObjectFormat { .. })));

        let body = FileBody {
            block_ids: vec![],
            size: i64::MAX as u64,
        };
        assert_eq!(decode_file(&encode_file(&body).unwrap(), &id('a')).unwrap(), body);
    }
}
