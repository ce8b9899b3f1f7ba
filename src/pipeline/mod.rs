//! Browsing pipeline: filter, paginate and render the loaded dataset.
//!
//! - `filter`: pure filter engine and facet discovery
//! - `pagination`: page windows and navigation
//! - `session`: intent-driven state shared by every front end
//! - `render`: the drawing boundary

pub mod filter;
pub mod pagination;
pub mod render;
pub mod session;

pub use filter::{facet_options, filter_records};
pub use pagination::{PageState, Paginator, page_count, window};
pub use render::{PageView, Renderer};
pub use session::{Effect, Intent, LoadSummary, Loader, Session, ViewStatus};
