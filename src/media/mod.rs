pub mod file;
pub mod handles;

pub use file::SourceFile;
pub use handles::{HandleRegistry, ImageBlob, ImageHandle};
