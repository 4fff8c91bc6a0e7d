//! Terminal widgets for watching the pipeline run.

mod dashboard;
mod error;

pub use dashboard::{render_dashboard, DashboardState};
pub use error::MonitorError;
