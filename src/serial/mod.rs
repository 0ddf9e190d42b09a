pub mod reader;

pub use reader::{FrameReader, RawFrame};
