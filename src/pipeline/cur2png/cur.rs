use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::PNG_SIGNATURE;
use crate::pipeline::cursor_types::{CursorResource, FrameEntry, ResourceKind, ResourceType};
use crate::pipeline::error::{ConvResult, ConversionError, truncated};

const ICO_TYPE_ICON: u16 = 1;
const ICO_TYPE_CUR: u16 = 2;
const ICONDIR_SIZE: usize = 6;
const ICONDIRENTRY_SIZE: usize = 16;

pub struct CurParser;

#[derive(Debug)]
struct IconDirEntry {
    width: u8,
    height: u8,
    color_count: u8,
    _reserved: u8,
    // planes / hotspot x
    field_a: u16,
    // bit count / hotspot y
    field_b: u16,
    size_bytes: u32,
    offset: u32,
}

impl CurParser {
    pub fn can_parse(data: &[u8]) -> bool {
        data.len() >= 4
            && data[0] == 0
            && data[1] == 0
            && matches!(
                u16::from_le_bytes([data[2], data[3]]),
                ICO_TYPE_ICON | ICO_TYPE_CUR
            )
    }

    pub fn parse(data: Vec<u8>) -> ConvResult<CursorResource> {
        Self::parse_with_kind(data, ResourceKind::Static)
    }

    pub(crate) fn parse_with_kind(data: Vec<u8>, kind: ResourceKind) -> ConvResult<CursorResource> {
        let mut cursor = Cursor::new(data.as_slice());

        let reserved = cursor
            .read_u16::<LittleEndian>()
            .map_err(truncated("icon directory header"))?;
        let ico_type = cursor
            .read_u16::<LittleEndian>()
            .map_err(truncated("icon directory header"))?;
        let image_count = cursor
            .read_u16::<LittleEndian>()
            .map_err(truncated("icon directory header"))? as usize;

        if reserved != 0 {
            return Err(ConversionError::malformed(
                "invalid reserved field in icon directory",
            ));
        }
        let resource_type = match ico_type {
            ICO_TYPE_ICON => ResourceType::Icon,
            ICO_TYPE_CUR => ResourceType::Cursor,
            other => {
                return Err(ConversionError::malformed(format!(
                    "directory type {} is neither icon nor cursor",
                    other
                )));
            }
        };
        if image_count == 0 {
            return Err(ConversionError::malformed("directory has no images"));
        }

        let table_end = ICONDIR_SIZE + image_count * ICONDIRENTRY_SIZE;
        if table_end > data.len() {
            return Err(ConversionError::malformed(format!(
                "entry table of {} images extends past end of file ({} > {} bytes)",
                image_count,
                table_end,
                data.len()
            )));
        }

        let mut entries = Vec::with_capacity(image_count);
        for index in 0..image_count {
            let raw = Self::read_dir_entry(&mut cursor)?;
            entries.push(Self::to_frame_entry(&data, &raw, resource_type, index)?);
        }

        Ok(CursorResource {
            data,
            resource_type,
            kind,
            entries,
        })
    }

    fn read_dir_entry(cursor: &mut Cursor<&[u8]>) -> ConvResult<IconDirEntry> {
        let mut read = || -> std::io::Result<IconDirEntry> {
            Ok(IconDirEntry {
                width: cursor.read_u8()?,
                height: cursor.read_u8()?,
                color_count: cursor.read_u8()?,
                _reserved: cursor.read_u8()?,
                field_a: cursor.read_u16::<LittleEndian>()?,
                field_b: cursor.read_u16::<LittleEndian>()?,
                size_bytes: cursor.read_u32::<LittleEndian>()?,
                offset: cursor.read_u32::<LittleEndian>()?,
            })
        };
        read().map_err(truncated("directory entry"))
    }

    fn to_frame_entry(
        data: &[u8],
        raw: &IconDirEntry,
        resource_type: ResourceType,
        index: usize,
    ) -> ConvResult<FrameEntry> {
        let offset = raw.offset as usize;
        let size = raw.size_bytes as usize;

        match offset.checked_add(size) {
            Some(end) if end <= data.len() => {}
            _ => {
                return Err(ConversionError::malformed(format!(
                    "image {} data ({} bytes at {}) extends beyond file bounds",
                    index, size, offset
                )));
            }
        }

        let width = if raw.width == 0 { 256 } else { raw.width as u32 };
        let height = if raw.height == 0 { 256 } else { raw.height as u32 };

        let (hotspot, declared_bits) = match resource_type {
            ResourceType::Cursor => (Some((raw.field_a, raw.field_b)), 0),
            ResourceType::Icon => (None, raw.field_b),
        };

        let payload = &data[offset..offset + size];
        let bit_count = if declared_bits != 0 {
            declared_bits
        } else {
            peek_bit_count(payload).unwrap_or_else(|| bits_from_color_count(raw.color_count))
        };

        Ok(FrameEntry {
            width,
            height,
            bit_count,
            hotspot,
            offset,
            size,
        })
    }

    /// Picks the entry with the largest area, then the deepest colour.
    /// Ties keep the first declared entry.
    pub fn select_frame(resource: &CursorResource) -> ConvResult<(&FrameEntry, &[u8])> {
        let mut best: Option<&FrameEntry> = None;
        for entry in &resource.entries {
            let better = match best {
                None => true,
                Some(current) => {
                    (entry.area(), entry.bit_count) > (current.area(), current.bit_count)
                }
            };
            if better {
                best = Some(entry);
            }
        }

        let entry = best.ok_or_else(|| ConversionError::malformed("directory has no images"))?;
        log::debug!(
            "selected {}x{} @ {}bpp out of {} image(s)",
            entry.width,
            entry.height,
            entry.bit_count,
            resource.entries.len()
        );

        let blob = resource
            .data
            .get(entry.offset..entry.offset + entry.size)
            .ok_or_else(|| ConversionError::malformed("image data extends beyond file bounds"))?;
        Ok((entry, blob))
    }
}

fn peek_bit_count(payload: &[u8]) -> Option<u16> {
    if payload.starts_with(PNG_SIGNATURE) {
        return Some(32);
    }
    if payload.len() >= 16 {
        let bits = u16::from_le_bytes([payload[14], payload[15]]);
        if bits != 0 {
            return Some(bits);
        }
    }
    None
}

fn bits_from_color_count(color_count: u8) -> u16 {
    match color_count {
        0 => 0,
        n => (n as u32).next_power_of_two().trailing_zeros() as u16,
    }
}
