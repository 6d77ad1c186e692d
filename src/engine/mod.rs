mod options;
mod scheduler;
mod stage_state;

pub use options::SchedulerOptions;
pub use scheduler::Scheduler;
pub use stage_state::{FailureReason, StageReport, StageState};
