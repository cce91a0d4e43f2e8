#![warn(missing_docs)]

//! Cross-sections of layered damascus billets.
//!
//! Cutting a billet across its length and etching the face shows the
//! banded pattern. [`extract_cross_section`] renders that face from the
//! current layer geometry as an 8-bit grayscale raster: bright layers at
//! 255, dark layers at 50, on a 255 background.
//!
//! # Example
//!
//! ```
//! use damascus_kernel::{Billet, BilletConfig};
//! use damascus_section::{extract_cross_section, SectionSettings};
//!
//! let billet = Billet::from_config(&BilletConfig::default()).unwrap();
//! let section = extract_cross_section(&billet, &SectionSettings::default()).unwrap();
//! assert_eq!(section.resolution(), 500);
//! ```

mod error;
mod export;
mod slice;

pub use error::{Result, SectionError};
pub use export::{export_cross_section, RasterWriter};
pub use slice::{
    extract_cross_section, CrossSection, SectionSettings, SectionStats, BACKGROUND, BRIGHT, DARK,
};
