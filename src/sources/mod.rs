//! Origin feed implementations with conditional compilation support.
//!
//! Each origin is protected by a feature flag so minimal builds can include
//! only the origins they need.
//!
//! # Feature Flags
//!
//! - `source-dmhy` - Enables the DMHY source
//! - `source-acgrip` - Enables the ACG.RIP source
//! - `all-sources` - Enables all sources (default)
//!
//! # Examples
//!
//! Build with only DMHY support:
//! ```bash
//! cargo build --no-default-features --features source-dmhy
//! ```
//!
//! # Available Sources
//!
//! - [`DmhySource`] - DMHY (requires `source-dmhy` feature)
//! - [`AcgRipSource`] - ACG.RIP (requires `source-acgrip` feature)

#[cfg(feature = "source-dmhy")]
pub mod dmhy;

#[cfg(feature = "source-acgrip")]
pub mod acgrip;

#[cfg(feature = "source-dmhy")]
pub use dmhy::DmhySource;

#[cfg(feature = "source-acgrip")]
pub use acgrip::AcgRipSource;
