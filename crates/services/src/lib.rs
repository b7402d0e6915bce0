#![forbid(unsafe_code)]

pub mod admin;
pub mod app_services;
pub mod catalog;
pub mod course_tree;
pub mod dashboard;
pub mod error;
pub mod player;
pub mod progress_persister;
pub mod session;
pub mod settings;

#[cfg(test)]
mod testing;

pub use course_core::Clock;

pub use admin::{AdminDraft, AdminRecord, AdminService, AdminTarget};
pub use app_services::AppServices;
pub use catalog::{CatalogEntry, CatalogService};
pub use course_tree::CourseTreeLoader;
pub use dashboard::{CourseProgressLine, DashboardService, DashboardStats};
pub use error::{
    AdminError, AppServicesError, CatalogError, CourseTreeError, DashboardError, PlayerError,
    ProgressError, SessionContextError, SettingsServiceError,
};
pub use player::{CompletionOutcome, CoursePlayer, LoadStatus, LoadTicket};
pub use progress_persister::{ProgressPersister, ReconcileOutcome};
pub use session::{SessionContext, SessionSnapshot};
pub use settings::SettingsService;
