#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

//! GCN models for node classification, built on candle.
//!
//! # Modules
//!
//! - [`adjacency`]: dense graph operators from a [`planetix_core::Graph`]
//! - [`conv`]: [`GCNLayer`] (mean aggregation) and [`GCNConv`] (symmetric
//!   normalization)
//! - [`readout`]: [`MLPReadout`]
//! - [`net`]: [`GCNNet`] and [`GCNNetPyg`]
//! - [`loss`]: class-weighted cross-entropy
//!
//! # Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device};
//! use candle_nn::{VarBuilder, VarMap};
//! use planetix_nn::{feature_indices, mean_adjacency, GCNNet, NetParams};
//!
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//! let net = GCNNet::new(&NetParams::default(), vb)?;
//!
//! let adj = mean_adjacency(&graph, &device)?;
//! let h = feature_indices(&graph, &device)?;
//! let logits = net.forward(&adj, &h, true)?;
//! let loss = net.loss(&logits, &labels)?;
//! ```

pub mod adjacency;
pub mod conv;
pub mod error;
pub mod loss;
pub mod net;
pub mod readout;

pub use adjacency::{feature_indices, gcn_norm_adjacency, mean_adjacency};
pub use conv::{GCNConv, GCNLayer};
pub use error::{Error, Result};
pub use loss::{class_weights, weighted_loss};
pub use net::{GCNNet, GCNNetPyg, NetParams};
pub use readout::MLPReadout;
