//! Background lifecycle jobs.
//!
//! - Inactivity monitor: stops instances whose heartbeat went stale
//! - Daily shutdown: stops every assigned instance at a fixed local hour
//!
//! Both loops share one `Reconciler` and the per-instance locks used by the
//! portal handlers.

mod daily_shutdown;
mod inactivity;
mod reconciler;
mod schedule;
mod supervisor;

pub use daily_shutdown::run_daily_shutdown_loop;
pub use inactivity::run_inactivity_loop;
pub use reconciler::{Reconciler, SweepReport};
pub use schedule::DailySchedule;
pub use supervisor::{JobSettings, JobSupervisor};
