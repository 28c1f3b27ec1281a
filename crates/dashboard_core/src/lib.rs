//! Mutation feedback and cursor-paginated list synchronization for the admin
//! dashboard: notification registry, mutation coordinator, cursor pager and
//! the list/surface orchestrator that ties them together.

pub mod config;
pub mod data_source;
pub mod error;
pub mod mutation;
pub mod notifications;
pub mod orchestrator;
pub mod pager;
pub mod resources;
pub mod session;
pub mod trigger;
pub mod validation;

pub use config::{load_settings, DashboardSettings};
pub use data_source::{DataSource, HttpDataSource};
pub use error::{DashboardError, StateError, TransportError, TransportErrorKind};
pub use mutation::{MutationCoordinator, MutationObserver, MutationRequest, NoopObserver};
pub use notifications::{
    MutationKind, Notification, NotificationEvent, NotificationHandle, NotificationRegistry,
    NotificationStatus, SupersededResolution,
};
pub use orchestrator::{ListOrchestrator, ListStatus, ListView, SubmitOutcome, SurfaceMode};
pub use pager::{CursorPager, FetchOutcome, LoadStatus, PagerEvent};
pub use resources::{Blogs, Cashflows, DraftForm, Homestays, Periods, Positions, Resource};
pub use session::DashboardSession;
pub use validation::{FieldError, FieldErrors};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
