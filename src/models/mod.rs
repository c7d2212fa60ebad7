//! Data models for the occupancy ledger

pub mod current_status;
pub mod hourly_aggregate;
pub mod notification;
pub mod visitor_event;

// Re-export commonly used types
pub use current_status::{CurrentStatus, DashboardSnapshot, FloorPolicy, OccupancyStatus};
pub use hourly_aggregate::{HourlyAggregate, HourlyStats};
pub use notification::{Notification, RealtimeEvent};
pub use visitor_event::{RecentEvent, VisitorEvent, VisitorEventType};
