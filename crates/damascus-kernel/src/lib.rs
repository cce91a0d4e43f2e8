#![warn(missing_docs)]

//! Layered billet model and forging deformations.
//!
//! A [`Billet`] is a stack of thin rectangular [`Layer`]s of alternating
//! bright and dark steel. Operators deform the stack in place:
//!
//! - [`ops::wedge`] splits the top of the stack over a wedge (feather)
//! - [`ops::twist`] rotates each layer about its own mid-plane along the length
//! - [`ops::compress`] scales heights uniformly
//! - [`ops::drill`] / [`ops::drill_grid`] push material away from holes (raindrop)
//! - [`ops::forge`] draws the billet into a square or octagonal bar
//!
//! Each call returns an [`OperationReport`] and appends to the billet's
//! [`OperationHistory`]. A [`Session`] adds the workflow on top: the
//! forge-before-twist rule, undo by replay, and reset.
//!
//! # Example
//!
//! ```
//! use damascus_kernel::{Billet, BilletConfig, Settings};
//! use damascus_kernel::ops::{wedge, WedgeParams};
//!
//! let mut billet = Billet::from_config(&BilletConfig::default()).unwrap();
//! let params = WedgeParams { depth: 18.0, angle_degrees: 35.0, split_gap: 6.0 };
//! let report = wedge(&mut billet, &params, &Settings::default()).unwrap();
//! assert!(report.stat("max_horizontal").unwrap() > 0.0);
//! ```

mod billet;
mod config;
mod error;
mod export;
mod history;
mod layer;
pub mod ops;
mod report;
mod session;
mod stats;

pub use billet::Billet;
pub use config::{
    BilletConfig, BuildPlate, ForgeSettings, ParameterLimits, ParameterRange, SessionSettings,
    Settings,
};
pub use error::{BilletError, Result};
pub use export::{MeshWriter, TaggedMesh};
pub use history::{param_map, OperationHistory, OperationLog, OperationRecord, ParamMap};
pub use layer::{DeformationRecord, Layer, Material};
pub use ops::Operation;
pub use report::{Diagnostic, DiagnosticLevel, Diagnostics, DisplacementStats, OperationReport};
pub use session::Session;
pub use stats::{BilletInfo, BilletStats, LayerStats};
