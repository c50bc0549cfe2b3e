//! Optional extensions to the base camera rig.

pub mod cursor_lock;
#[cfg(feature = "extension_pivot_indicator")]
pub mod pivot_indicator;
