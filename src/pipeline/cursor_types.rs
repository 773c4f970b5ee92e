// Cursor data types for pipeline operations

use image::RgbaImage;
use std::path::PathBuf;

use super::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Icon,
    Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Static,
    Animated { frame_count: usize },
}

/// One candidate image inside an icon/cursor directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub width: u32,
    pub height: u32,
    pub bit_count: u16,
    /// Only cursor directories carry a hotspot.
    pub hotspot: Option<(u16, u16)>,
    pub offset: usize,
    pub size: usize,
}

impl FrameEntry {
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Parsed view of one input file. Owns the bytes its entries point into.
#[derive(Debug, Clone)]
pub struct CursorResource {
    pub data: Vec<u8>,
    pub resource_type: ResourceType,
    pub kind: ResourceKind,
    pub entries: Vec<FrameEntry>,
}

/// Decoded frame: straight-alpha RGBA, top-down rows.
#[derive(Debug, Clone)]
pub struct BitmapImage {
    pub image: RgbaImage,
    pub hotspot: (u16, u16),
}

impl BitmapImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub hotspot: (u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    pub source_path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

pub type ConversionResult = Result<ConvertedFile, ConversionFailure>;

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub converted: Vec<ConvertedFile>,
    pub failures: Vec<ConversionFailure>,
    /// Files never dispatched because the batch was cancelled.
    pub skipped: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.converted.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn push(&mut self, result: ConversionResult) {
        match result {
            Ok(converted) => self.converted.push(converted),
            Err(failure) => self.failures.push(failure),
        }
    }
}
