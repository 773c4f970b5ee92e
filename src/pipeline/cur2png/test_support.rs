// In-memory fixture builders for cursor tests

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

pub const BI_RGB: u32 = 0;

fn stride(width: u32, bits: u16) -> usize {
    (((width * bits as u32) + 31) / 32 * 4) as usize
}

fn write_info_header(out: &mut Vec<u8>, width: u32, height: i32, bits: u16, compression: u32) {
    out.write_u32::<LittleEndian>(40).unwrap();
    out.write_i32::<LittleEndian>(width as i32).unwrap();
    out.write_i32::<LittleEndian>(height).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(bits).unwrap();
    out.write_u32::<LittleEndian>(compression).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
}

/// Packs a top-down plane of small values into bottom-up padded rows.
fn pack_plane(width: u32, height: u32, bits: u16, values: &[u8]) -> Vec<u8> {
    let stride = stride(width, bits);
    let mut out = vec![0u8; stride * height as usize];
    for y in 0..height as usize {
        let row = &mut out[(height as usize - 1 - y) * stride..][..stride];
        for x in 0..width as usize {
            let v = values[y * width as usize + x];
            let bit = x * bits as usize;
            let shift = 8 - bits as usize - (bit % 8);
            row[bit / 8] |= v << shift;
        }
    }
    out
}

/// Builds an AND mask plane. `transparent` is top-down.
pub fn mask_plane(width: u32, height: u32, transparent: &[bool]) -> Vec<u8> {
    let bits: Vec<u8> = transparent.iter().map(|&t| t as u8).collect();
    pack_plane(width, height, 1, &bits)
}

/// Indexed (1/4/8 bpp) DIB with palette and AND mask.
pub fn indexed_dib(
    width: u32,
    height: u32,
    bits: u16,
    palette: &[[u8; 3]],
    indices: &[u8],
    transparent: &[bool],
) -> Vec<u8> {
    let mut out = Vec::new();
    write_info_header(&mut out, width, (height * 2) as i32, bits, BI_RGB);
    for i in 0..(1usize << bits) {
        let [r, g, b] = palette.get(i).copied().unwrap_or([0, 0, 0]);
        out.write_all(&[b, g, r, 0]).unwrap();
    }
    out.extend(pack_plane(width, height, bits, indices));
    out.extend(mask_plane(width, height, transparent));
    out
}

/// 24 bpp DIB with AND mask. `pixels` are top-down RGB.
pub fn rgb24_dib(width: u32, height: u32, pixels: &[[u8; 3]], transparent: &[bool]) -> Vec<u8> {
    let mut out = Vec::new();
    write_info_header(&mut out, width, (height * 2) as i32, 24, BI_RGB);
    let stride = stride(width, 24);
    for y in (0..height as usize).rev() {
        let mut row = Vec::with_capacity(stride);
        for x in 0..width as usize {
            let [r, g, b] = pixels[y * width as usize + x];
            row.extend_from_slice(&[b, g, r]);
        }
        row.resize(stride, 0);
        out.extend(row);
    }
    out.extend(mask_plane(width, height, transparent));
    out
}

/// 16 bpp X1R5G5B5 DIB with AND mask. `pixels` are top-down 5-bit RGB.
pub fn rgb16_dib(width: u32, height: u32, pixels: &[[u8; 3]], transparent: &[bool]) -> Vec<u8> {
    let mut out = Vec::new();
    write_info_header(&mut out, width, (height * 2) as i32, 16, BI_RGB);
    let stride = stride(width, 16);
    for y in (0..height as usize).rev() {
        let mut row = Vec::with_capacity(stride);
        for x in 0..width as usize {
            let [r, g, b] = pixels[y * width as usize + x];
            let v = ((r as u16 & 0x1f) << 10) | ((g as u16 & 0x1f) << 5) | (b as u16 & 0x1f);
            row.write_u16::<LittleEndian>(v).unwrap();
        }
        row.resize(stride, 0);
        out.extend(row);
    }
    out.extend(mask_plane(width, height, transparent));
    out
}

/// Grows the 40-byte header of `dib` to `size` bytes (V4 = 108, V5 = 124),
/// zero-filling the extra fields.
pub fn widen_header(dib: &[u8], size: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(dib.len() + size as usize - 40);
    out.write_u32::<LittleEndian>(size).unwrap();
    out.extend_from_slice(&dib[4..40]);
    out.resize(size as usize, 0);
    out.extend_from_slice(&dib[40..]);
    out
}

/// 32 bpp DIB. `pixels` are top-down RGBA. With `mask` the declared height is doubled.
pub fn argb32_dib(width: u32, height: u32, pixels: &[[u8; 4]], mask: Option<&[bool]>) -> Vec<u8> {
    let declared = if mask.is_some() { height * 2 } else { height };
    let mut out = Vec::new();
    write_info_header(&mut out, width, declared as i32, 32, BI_RGB);
    for y in (0..height as usize).rev() {
        for x in 0..width as usize {
            let [r, g, b, a] = pixels[y * width as usize + x];
            out.extend_from_slice(&[b, g, r, a]);
        }
    }
    if let Some(mask) = mask {
        out.extend(mask_plane(width, height, mask));
    }
    out
}

/// Bare header with an arbitrary compression value, followed by some filler.
pub fn compressed_dib(width: u32, height: u32, bits: u16, compression: u32) -> Vec<u8> {
    let mut out = Vec::new();
    write_info_header(&mut out, width, (height * 2) as i32, bits, compression);
    out.extend(vec![0u8; 64]);
    out
}

pub struct DirEntry {
    pub width: u8,
    pub height: u8,
    pub color_count: u8,
    /// Hotspot for cursors, planes/bit count for icons.
    pub field_a: u16,
    pub field_b: u16,
}

impl DirEntry {
    pub fn cursor(width: u8, height: u8, hotspot: (u16, u16)) -> Self {
        Self {
            width,
            height,
            color_count: 0,
            field_a: hotspot.0,
            field_b: hotspot.1,
        }
    }

    pub fn icon(width: u8, height: u8, bit_count: u16) -> Self {
        Self {
            width,
            height,
            color_count: 0,
            field_a: 1,
            field_b: bit_count,
        }
    }
}

/// Icon (type 1) or cursor (type 2) directory wrapping the given payloads.
pub fn directory(resource_type: u16, frames: &[(DirEntry, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(resource_type).unwrap();
    out.write_u16::<LittleEndian>(frames.len() as u16).unwrap();

    let mut offset = 6 + 16 * frames.len();
    for (entry, payload) in frames {
        out.write_u8(entry.width).unwrap();
        out.write_u8(entry.height).unwrap();
        out.write_u8(entry.color_count).unwrap();
        out.write_u8(0).unwrap();
        out.write_u16::<LittleEndian>(entry.field_a).unwrap();
        out.write_u16::<LittleEndian>(entry.field_b).unwrap();
        out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(offset as u32).unwrap();
        offset += payload.len();
    }
    for (_, payload) in frames {
        out.extend_from_slice(payload);
    }
    out
}

pub fn cursor(frames: &[(DirEntry, Vec<u8>)]) -> Vec<u8> {
    directory(2, frames)
}

fn chunk(out: &mut Vec<u8>, name: &[u8], data: &[u8]) {
    out.write_all(name).unwrap();
    out.write_u32::<LittleEndian>(data.len() as u32).unwrap();
    out.write_all(data).unwrap();
    if data.len() % 2 == 1 {
        out.write_u8(0).unwrap();
    }
}

/// RIFF/ACON container with one `icon` chunk per embedded cursor file.
pub fn ani(icons: &[Vec<u8>], seq: Option<&[u32]>) -> Vec<u8> {
    let steps = seq.map(|s| s.len()).unwrap_or(icons.len()) as u32;

    let mut anih = Vec::new();
    for value in [36, icons.len() as u32, steps, 0, 0, 0, 0, 10, 0x1] {
        anih.write_u32::<LittleEndian>(value).unwrap();
    }

    let mut frames = b"fram".to_vec();
    for icon in icons {
        chunk(&mut frames, b"icon", icon);
    }

    let mut body = b"ACON".to_vec();
    chunk(&mut body, b"anih", &anih);
    chunk(&mut body, b"LIST", &frames);
    if let Some(seq) = seq {
        let mut data = Vec::new();
        for step in seq {
            data.write_u32::<LittleEndian>(*step).unwrap();
        }
        chunk(&mut body, b"seq ", &data);
    }

    let mut out = b"RIFF".to_vec();
    out.write_u32::<LittleEndian>(body.len() as u32).unwrap();
    out.extend(body);
    out
}
