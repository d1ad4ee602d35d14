// SPDX-License-Identifier: MIT

// === Sub-modules ===
pub mod allocator;
pub mod bitmap;
pub mod errors;
pub mod geometry;

// === Core Traits ===
pub mod traits {
    pub use super::allocator::FreeSectorMap;
    pub use super::bitmap::BitmapOps;
}

// === Error types ===
pub use errors::*;
