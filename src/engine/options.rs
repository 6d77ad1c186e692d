use crate::task::TaskPolicy;

#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    /// Cap on invocations per stage; the task timeout applies either way
    pub max_attempts: Option<usize>,
    /// Replaces the policy every task declares
    pub policy_override: Option<TaskPolicy>,
}

impl SchedulerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, value: usize) -> Self {
        self.max_attempts = Some(value);
        self
    }

    pub fn with_policy_override(mut self, value: TaskPolicy) -> Self {
        self.policy_override = Some(value);
        self
    }
}
