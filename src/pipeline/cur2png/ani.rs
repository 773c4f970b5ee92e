use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

use super::cur::CurParser;
use crate::pipeline::cursor_types::{CursorResource, ResourceKind};
use crate::pipeline::error::{ConvResult, ConversionError, truncated};

const SIGNATURE: &[u8] = b"RIFF";
const ANI_TYPE: &[u8] = b"ACON";
const HEADER_CHUNK: &[u8] = b"anih";
const LIST_CHUNK: &[u8] = b"LIST";
const SEQ_CHUNK: &[u8] = b"seq ";
const FRAME_TYPE: &[u8] = b"fram";
const ICON_CHUNK: &[u8] = b"icon";

const ANIH_SIZE: u32 = 36;
const ICON_FLAG: u32 = 0x1;

/// Reads an animated cursor only as far as needed to find its static frame.
pub struct AniParser;

#[derive(Debug)]
struct AnihHeader {
    size: u32,
    frame_count: u32,
    _step_count: u32,
    _width: u32,
    _height: u32,
    _bit_count: u32,
    _planes: u32,
    _display_rate: u32,
    flags: u32,
}

impl AnihHeader {
    fn validate(&self) -> ConvResult<()> {
        if self.size != ANIH_SIZE {
            return Err(ConversionError::malformed(format!(
                "invalid ANI header size: {}",
                self.size
            )));
        }
        if (self.flags & ICON_FLAG) == 0 {
            return Err(ConversionError::malformed(
                "raw bitmap ANI frames are not supported",
            ));
        }
        Ok(())
    }
}

/// Byte range of a chunk body within the file.
#[derive(Debug, Clone, Copy)]
struct Chunk {
    name: [u8; 4],
    start: usize,
    end: usize,
}

impl AniParser {
    pub fn can_parse(data: &[u8]) -> bool {
        data.len() >= 12 && &data[0..4] == SIGNATURE && &data[8..12] == ANI_TYPE
    }

    /// The static frame is the first step of the `seq ` chunk, or frame 0 without one.
    pub fn parse(data: &[u8]) -> ConvResult<CursorResource> {
        if !Self::can_parse(data) {
            return Err(ConversionError::malformed("not a valid .ANI file"));
        }

        let mut cursor = Cursor::new(data);
        cursor
            .seek(SeekFrom::Start(12))
            .map_err(truncated("RIFF header"))?;

        let mut header: Option<AnihHeader> = None;
        let mut frames: Vec<Chunk> = Vec::new();
        let mut first_step: Option<u32> = None;

        while (cursor.position() as usize) + 8 <= data.len() {
            let chunk = Self::read_chunk(&mut cursor, data)?;

            match &chunk.name[..] {
                HEADER_CHUNK => {
                    let anih = Self::read_anih_header(&mut cursor)?;
                    anih.validate()?;
                    header = Some(anih);
                }
                LIST_CHUNK => {
                    let mut list_type = [0u8; 4];
                    cursor
                        .read_exact(&mut list_type)
                        .map_err(truncated("LIST chunk"))?;
                    if list_type == FRAME_TYPE {
                        frames = Self::read_frames(&mut cursor, data, chunk.end)?;
                    }
                }
                SEQ_CHUNK => {
                    if chunk.end - chunk.start >= 4 {
                        first_step = Some(
                            cursor
                                .read_u32::<LittleEndian>()
                                .map_err(truncated("seq chunk"))?,
                        );
                    }
                }
                _ => {}
            }

            Self::skip_to_end(&mut cursor, chunk.end);
        }

        let header = header.ok_or_else(|| ConversionError::malformed("missing anih chunk"))?;
        if frames.is_empty() {
            return Err(ConversionError::malformed("missing frame list"));
        }
        if header.frame_count as usize != frames.len() {
            log::debug!(
                "anih declares {} frames, found {}",
                header.frame_count,
                frames.len()
            );
        }

        let index = first_step.unwrap_or(0) as usize;
        let frame = frames.get(index).ok_or_else(|| {
            ConversionError::malformed(format!(
                "sequence references frame {} of {}",
                index,
                frames.len()
            ))
        })?;
        log::debug!("using frame {} of {} as static image", index, frames.len());

        CurParser::parse_with_kind(
            data[frame.start..frame.end].to_vec(),
            ResourceKind::Animated {
                frame_count: frames.len(),
            },
        )
    }

    fn read_chunk(cursor: &mut Cursor<&[u8]>, data: &[u8]) -> ConvResult<Chunk> {
        let mut name = [0u8; 4];
        cursor
            .read_exact(&mut name)
            .map_err(truncated("chunk header"))?;
        let size = cursor
            .read_u32::<LittleEndian>()
            .map_err(truncated("chunk header"))? as usize;
        let start = cursor.position() as usize;

        match start.checked_add(size) {
            Some(end) if end <= data.len() => Ok(Chunk { name, start, end }),
            _ => Err(ConversionError::malformed(format!(
                "chunk '{}' extends beyond file",
                String::from_utf8_lossy(&name)
            ))),
        }
    }

    /// Seeks past a chunk body, honouring RIFF word alignment.
    fn skip_to_end(cursor: &mut Cursor<&[u8]>, end: usize) {
        let aligned = end + (end & 1);
        cursor.set_position(aligned as u64);
    }

    fn read_anih_header(cursor: &mut Cursor<&[u8]>) -> ConvResult<AnihHeader> {
        let mut read = || -> std::io::Result<AnihHeader> {
            Ok(AnihHeader {
                size: cursor.read_u32::<LittleEndian>()?,
                frame_count: cursor.read_u32::<LittleEndian>()?,
                _step_count: cursor.read_u32::<LittleEndian>()?,
                _width: cursor.read_u32::<LittleEndian>()?,
                _height: cursor.read_u32::<LittleEndian>()?,
                _bit_count: cursor.read_u32::<LittleEndian>()?,
                _planes: cursor.read_u32::<LittleEndian>()?,
                _display_rate: cursor.read_u32::<LittleEndian>()?,
                flags: cursor.read_u32::<LittleEndian>()?,
            })
        };
        read().map_err(truncated("anih chunk"))
    }

    fn read_frames(
        cursor: &mut Cursor<&[u8]>,
        data: &[u8],
        list_end: usize,
    ) -> ConvResult<Vec<Chunk>> {
        let mut frames = Vec::new();

        while (cursor.position() as usize) + 8 <= list_end {
            let chunk = Self::read_chunk(cursor, data)?;
            if chunk.end > list_end {
                return Err(ConversionError::malformed("icon chunk extends beyond frame list"));
            }
            if &chunk.name[..] != ICON_CHUNK {
                return Err(ConversionError::malformed("expected icon chunk in frame list"));
            }
            frames.push(chunk);
            Self::skip_to_end(cursor, chunk.end);
        }

        Ok(frames)
    }
}
