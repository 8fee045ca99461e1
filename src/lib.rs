pub mod error;
pub mod cursor;
pub mod format;
pub mod record;
pub mod section;
pub mod decomp;
pub mod bitstream;
pub mod rpd;
pub mod extract;
pub mod builder;

pub use bitstream::{ChecksumState, DecodedBitstream};
pub use decomp::Scheme;
pub use error::{ExtractError, Result};
pub use extract::{extract, ExtractOptions};
pub use format::{ContainerKind, ObjectTag};
pub use rpd::RpdImage;
