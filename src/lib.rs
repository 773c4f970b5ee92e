// Library exports for cur2png

pub mod config;
pub mod event;
pub mod pipeline;
pub mod pipeline_worker;

// Re-export commonly used types from pipeline
pub use pipeline::{
    cur2png,
    cursor_types::{BatchReport, BitmapImage, ConversionFailure, CursorResource, FrameEntry},
    error::{ConversionError, ErrorKind},
};
