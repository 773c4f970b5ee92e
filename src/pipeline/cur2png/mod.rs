// Windows cursor resource to RGBA decoding

pub mod ani;
pub mod converter;
pub mod cur;
pub mod dib;
pub mod png_writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use ani::AniParser;
pub use converter::{ConversionOptions, batch_convert, convert_cursor_file};
pub use cur::CurParser;

use super::cursor_types::{BitmapImage, CursorResource};
use super::error::{ConvResult, ConversionError};

pub(crate) const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorFormat {
    /// Icon or cursor directory (`.ico` / `.cur`)
    IconDir,
    /// RIFF `ACON` container (`.ani`)
    Ani,
}

impl CursorFormat {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if CurParser::can_parse(data) {
            Some(CursorFormat::IconDir)
        } else if AniParser::can_parse(data) {
            Some(CursorFormat::Ani)
        } else {
            None
        }
    }
}

pub fn load_resource(data: Vec<u8>) -> ConvResult<CursorResource> {
    match CursorFormat::detect(&data) {
        Some(CursorFormat::IconDir) => CurParser::parse(data),
        Some(CursorFormat::Ani) => AniParser::parse(&data),
        None => Err(ConversionError::malformed(
            "unrecognized header, neither icon, cursor nor animated cursor",
        )),
    }
}

/// Selects the best frame of a resource and composites it.
pub fn decode_resource(resource: &CursorResource) -> ConvResult<BitmapImage> {
    let (entry, blob) = CurParser::select_frame(resource)?;
    dib::decode_frame(entry, blob)
}
