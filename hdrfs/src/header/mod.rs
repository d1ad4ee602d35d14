// SPDX-License-Identifier: MIT
pub mod dump;
pub mod file_header;
pub mod record;
pub mod tier;

pub use dump::{HeaderDump, SectorContents};
pub use file_header::{DoubleIndex, FileHeader, IndexTable};
pub use tier::Tier;
