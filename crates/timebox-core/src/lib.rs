pub mod analytics;
pub mod calendar;
pub mod config;
pub mod export;
pub mod goals;
pub mod habits;
pub mod maintenance;
pub mod notify;
pub mod reviews;
pub mod sample;
pub mod scheduler;
pub mod session_manager;

pub use analytics::Analytics;
pub use calendar::Language;
pub use config::TimeboxConfig;
pub use export::{ExportEntity, ExportFormat};
pub use goals::GoalProgress;
pub use maintenance::Maintenance;
pub use notify::{LogNotifier, Notification, Notifier, WebhookNotifier};
pub use scheduler::Scheduler;
pub use session_manager::{CompleteSession, SessionError, SessionManager, StartSession};
