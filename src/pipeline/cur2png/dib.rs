// Mask-aware decoding of the device-independent bitmaps stored in cursor entries

use byteorder::{LittleEndian, ReadBytesExt};
use image::{Rgba, RgbaImage};
use std::io::Cursor;

use super::PNG_SIGNATURE;
use crate::pipeline::cursor_types::{BitmapImage, FrameEntry};
use crate::pipeline::error::{ConvResult, ConversionError, truncated};

const BITMAPINFOHEADER_SIZE: u32 = 40;
const BI_RGB: u32 = 0;

#[derive(Debug)]
struct InfoHeader {
    size: u32,
    width: i32,
    height: i32,
    _planes: u16,
    bit_count: u16,
    compression: u32,
    _size_image: u32,
    _x_ppm: i32,
    _y_ppm: i32,
    clr_used: u32,
    _clr_important: u32,
}

/// Bytes per stored row, padded to a 32-bit boundary.
fn row_stride(width: usize, bits: u16) -> Option<usize> {
    width
        .checked_mul(bits as usize)?
        .checked_add(31)
        .map(|b| b / 32 * 4)
}

/// A packed plane of `rows` rows, stored bottom-up unless `top_down`.
struct Plane<'a> {
    data: &'a [u8],
    stride: usize,
    rows: usize,
    top_down: bool,
}

impl<'a> Plane<'a> {
    fn row(&self, y: usize) -> &'a [u8] {
        let stored = if self.top_down { y } else { self.rows - 1 - y };
        let data: &'a [u8] = self.data;
        &data[stored * self.stride..][..self.stride]
    }
}

fn sub_byte_value(row: &[u8], x: usize, bits: u16) -> u8 {
    let bit = x * bits as usize;
    let shift = 8 - bits as usize - (bit % 8);
    let mask = ((1u16 << bits) - 1) as u8;
    (row[bit / 8] >> shift) & mask
}

/// Decodes the raw image payload of one directory entry into straight RGBA.
pub fn decode_frame(entry: &FrameEntry, blob: &[u8]) -> ConvResult<BitmapImage> {
    let hotspot = entry.hotspot.unwrap_or((0, 0));

    if blob.starts_with(PNG_SIGNATURE) {
        let image = image::load_from_memory_with_format(blob, image::ImageFormat::Png)
            .map_err(|e| ConversionError::malformed(format!("invalid PNG frame: {}", e)))?
            .to_rgba8();
        return Ok(BitmapImage { image, hotspot });
    }

    let image = decode_dib(blob, entry.height)?;
    Ok(BitmapImage { image, hotspot })
}

fn read_info_header(blob: &[u8]) -> ConvResult<InfoHeader> {
    let mut cursor = Cursor::new(blob);
    let mut read = || -> std::io::Result<InfoHeader> {
        Ok(InfoHeader {
            size: cursor.read_u32::<LittleEndian>()?,
            width: cursor.read_i32::<LittleEndian>()?,
            height: cursor.read_i32::<LittleEndian>()?,
            _planes: cursor.read_u16::<LittleEndian>()?,
            bit_count: cursor.read_u16::<LittleEndian>()?,
            compression: cursor.read_u32::<LittleEndian>()?,
            _size_image: cursor.read_u32::<LittleEndian>()?,
            _x_ppm: cursor.read_i32::<LittleEndian>()?,
            _y_ppm: cursor.read_i32::<LittleEndian>()?,
            clr_used: cursor.read_u32::<LittleEndian>()?,
            _clr_important: cursor.read_u32::<LittleEndian>()?,
        })
    };
    read().map_err(truncated("bitmap header"))
}

fn read_palette(blob: &[u8], header: &InfoHeader) -> ConvResult<Vec<[u8; 3]>> {
    if header.bit_count > 8 {
        return Ok(Vec::new());
    }

    let full = 1usize << header.bit_count;
    let count = match header.clr_used as usize {
        n if n > 0 && n < full => n,
        _ => full,
    };

    let start = header.size as usize;
    let table = start
        .checked_add(count * 4)
        .and_then(|end| blob.get(start..end))
        .ok_or_else(|| ConversionError::malformed("truncated palette"))?;

    Ok(table.chunks_exact(4).map(|q| [q[2], q[1], q[0]]).collect())
}

/// `entry_height` is the visual height declared by the directory entry; it tells a
/// 32 bpp image with a trailing AND mask apart from one without.
fn decode_dib(blob: &[u8], entry_height: u32) -> ConvResult<RgbaImage> {
    let header = read_info_header(blob)?;

    if header.size < BITMAPINFOHEADER_SIZE {
        return Err(ConversionError::malformed(format!(
            "bitmap header size {} is too small",
            header.size
        )));
    }
    if header.compression != BI_RGB {
        return Err(ConversionError::UnsupportedCompression(header.compression));
    }
    if !matches!(header.bit_count, 1 | 4 | 8 | 16 | 24 | 32) {
        return Err(ConversionError::malformed(format!(
            "unsupported bit depth {}",
            header.bit_count
        )));
    }
    if header.width <= 0 || header.height == 0 {
        return Err(ConversionError::malformed(format!(
            "invalid bitmap dimensions {}x{}",
            header.width, header.height
        )));
    }

    let width = header.width as usize;
    let declared_height = header.height.unsigned_abs() as usize;
    let top_down = header.height < 0;

    // Pre-alpha formats always store the AND mask below the colour plane.
    let has_mask = if header.bit_count == 32 {
        declared_height == 2 * entry_height as usize
            || (declared_height != entry_height as usize && declared_height == 2 * width)
    } else {
        true
    };
    let height = if has_mask {
        declared_height / 2
    } else {
        declared_height
    };
    if height == 0 {
        return Err(ConversionError::malformed("bitmap has no visible rows"));
    }

    let palette = read_palette(blob, &header)?;

    let color_start = header.size as usize + palette.len() * 4;
    let color_stride = row_stride(width, header.bit_count)
        .ok_or_else(|| ConversionError::malformed("bitmap width overflows"))?;
    let color_len = color_stride
        .checked_mul(height)
        .ok_or_else(|| ConversionError::malformed("bitmap size overflows"))?;
    let color_data = color_start
        .checked_add(color_len)
        .and_then(|end| blob.get(color_start..end))
        .ok_or_else(|| ConversionError::malformed("truncated color plane"))?;
    let color = Plane {
        data: color_data,
        stride: color_stride,
        rows: height,
        top_down,
    };

    let mask = if has_mask {
        let mask_start = color_start + color_len;
        let mask_stride = row_stride(width, 1)
            .ok_or_else(|| ConversionError::malformed("bitmap width overflows"))?;
        let mask_data = mask_stride
            .checked_mul(height)
            .and_then(|len| mask_start.checked_add(len))
            .and_then(|end| blob.get(mask_start..end));
        match mask_data {
            Some(data) => Some(Plane {
                data,
                stride: mask_stride,
                rows: height,
                top_down,
            }),
            // 32 bpp only consults the mask as a fallback
            None if header.bit_count == 32 => None,
            None => return Err(ConversionError::malformed("truncated mask plane")),
        }
    } else {
        None
    };

    let mut image = RgbaImage::new(width as u32, height as u32);
    if header.bit_count == 32 {
        composite_alpha(&mut image, &color, mask.as_ref());
    } else {
        let mask = mask.ok_or_else(|| ConversionError::malformed("missing mask plane"))?;
        composite_masked(&mut image, &color, &mask, header.bit_count, &palette)?;
    }

    Ok(image)
}

/// AND=1 is transparent, AND=0 opaque. Screen-inverting pixels (AND=1 with a
/// non-black colour) are approximated as transparent.
fn composite_masked(
    image: &mut RgbaImage,
    color: &Plane<'_>,
    mask: &Plane<'_>,
    bits: u16,
    palette: &[[u8; 3]],
) -> ConvResult<()> {
    let width = image.width() as usize;
    let mut inverted = 0usize;

    for y in 0..color.rows {
        let color_row = color.row(y);
        let mask_row = mask.row(y);

        for x in 0..width {
            let rgb = match bits {
                1 | 4 | 8 => {
                    let index = if bits == 8 {
                        color_row[x]
                    } else {
                        sub_byte_value(color_row, x, bits)
                    };
                    *palette.get(index as usize).ok_or_else(|| {
                        ConversionError::malformed(format!(
                            "palette index {} out of range ({} entries)",
                            index,
                            palette.len()
                        ))
                    })?
                }
                16 => {
                    let v = u16::from_le_bytes([color_row[x * 2], color_row[x * 2 + 1]]);
                    let expand = |c: u16| ((c << 3) | (c >> 2)) as u8;
                    [
                        expand((v >> 10) & 0x1f),
                        expand((v >> 5) & 0x1f),
                        expand(v & 0x1f),
                    ]
                }
                _ => {
                    let px = &color_row[x * 3..x * 3 + 3];
                    [px[2], px[1], px[0]]
                }
            };

            let transparent = sub_byte_value(mask_row, x, 1) == 1;
            let pixel = if transparent {
                if rgb != [0, 0, 0] {
                    inverted += 1;
                }
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([rgb[0], rgb[1], rgb[2], 255])
            };
            image.put_pixel(x as u32, y as u32, pixel);
        }
    }

    if inverted > 0 {
        log::debug!(
            "{} screen-inverting pixel(s) approximated as transparent",
            inverted
        );
    }
    Ok(())
}

/// Stored alpha is used as straight alpha. A frame with no alpha at all falls
/// back to the AND mask when there is one, otherwise to full opacity.
fn composite_alpha(image: &mut RgbaImage, color: &Plane<'_>, mask: Option<&Plane<'_>>) {
    let width = image.width() as usize;
    let mut any_alpha = false;

    for y in 0..color.rows {
        let row = color.row(y);
        for x in 0..width {
            let px = &row[x * 4..x * 4 + 4];
            any_alpha |= px[3] != 0;
            image.put_pixel(x as u32, y as u32, Rgba([px[2], px[1], px[0], px[3]]));
        }
    }

    if any_alpha {
        return;
    }

    log::debug!("32bpp frame has an empty alpha channel, using fallback opacity");
    for y in 0..color.rows {
        let mask_row = mask.map(|m| m.row(y));
        for x in 0..width {
            let transparent = mask_row.is_some_and(|row| sub_byte_value(row, x, 1) == 1);
            let pixel = image.get_pixel_mut(x as u32, y as u32);
            *pixel = if transparent {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([pixel[0], pixel[1], pixel[2], 255])
            };
        }
    }
}
