//! Transform steps that plug into [`crate::Node`].
//!
//! Each transform is a [`crate::NodeLogic`]; the node process picks one at
//! startup. Only the reference scoring transform ships today.

pub mod score;

pub use score::ScoreLogic;
