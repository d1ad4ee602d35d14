// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// Core Modules
pub mod core;
pub mod header;

// Reusable types and traits
pub use crate::core::traits::*;

/// Everything needed to allocate, persist and inspect file headers.
///
/// See [`prelude::FileHeader`] and [`prelude::FreeMap`].
pub mod prelude {
    pub use crate::core::bitmap::FreeMap;
    pub use crate::core::errors::*;
    pub use crate::core::geometry::*;
    pub use crate::core::traits::*;
    pub use crate::header::*;
    pub use hdrio::prelude::*;
}
