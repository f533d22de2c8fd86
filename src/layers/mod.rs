//! Layer opacity state and its broadcast to views.

mod info;
mod opacity;

pub use info::OpacityInfo;
pub use opacity::{LayerOpacityManager, ViewId};
