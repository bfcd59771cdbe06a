pub mod dynamic;
pub mod error;
pub mod host;
pub mod image;
pub mod layout;
pub mod paths;
pub mod segments;

pub use dynamic::*;
pub use error::*;
pub use host::*;
pub use image::*;
pub use layout::*;
pub use paths::*;
pub use segments::*;

#[cfg(test)]
pub(crate) mod testelf;
