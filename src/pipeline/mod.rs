pub mod cur2png;
pub mod cursor_types;
pub mod error;
pub mod fs_ops;
