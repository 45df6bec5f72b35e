//! Resolved task coordinates and the sandbox path they point at.

use crate::constants::SANDBOX_ROOT;
use crate::error::Error;

/// Physical location of a task's sandbox on an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCoordinates {
    pub agent_id: String,
    pub framework_id: String,
    pub executor_id: String,
    pub container_id: String,
    /// Nested task directory for tasks running inside a pod.
    pub task_path: Option<String>,
}

impl TaskCoordinates {
    pub fn new(
        agent_id: impl Into<String>,
        framework_id: impl Into<String>,
        executor_id: impl Into<String>,
        container_id: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            framework_id: framework_id.into(),
            executor_id: executor_id.into(),
            container_id: container_id.into(),
            task_path: None,
        }
    }

    pub fn with_task_path(mut self, task_path: impl Into<String>) -> Self {
        let task_path = task_path.into();
        self.task_path = if task_path.is_empty() {
            None
        } else {
            Some(task_path)
        };
        self
    }

    /// Every identifying component must be non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("agent id", &self.agent_id),
            ("framework id", &self.framework_id),
            ("executor id", &self.executor_id),
            ("container id", &self.container_id),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::EmptyCoordinate(name));
            }
        }
        Ok(())
    }

    /// Sandbox directory, always with a trailing slash.
    pub fn sandbox_path(&self) -> String {
        let mut path = format!(
            "{}/{}/frameworks/{}/executors/{}/runs/{}/",
            SANDBOX_ROOT, self.agent_id, self.framework_id, self.executor_id, self.container_id
        );
        if let Some(task_path) = &self.task_path {
            path.push_str(&format!("tasks/{}/", task_path));
        }
        path
    }

    /// Full path of `file` inside the sandbox.
    pub fn file_path(&self, file: &str) -> String {
        format!("{}{}", self.sandbox_path(), file)
    }
}
