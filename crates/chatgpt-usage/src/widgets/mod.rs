//! TUI widget modules

pub mod costs;
pub mod header;
pub mod heatmap;
pub mod model_popup;
pub mod popup;
pub mod shortcuts;
pub mod statistics;

pub use costs::*;
pub use header::*;
pub use heatmap::*;
pub use model_popup::*;
pub use popup::*;
pub use shortcuts::*;
pub use statistics::*;
