//! Jobs: compilation requests and the task graphs they own.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use farmjob_common::error::{FarmjobError, FarmjobResult};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::task::{Task, TaskId};

/// A render job as handed over by the host.
///
/// The compiler only ever touches `settings` and appends tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier assigned by the host.
    pub id: String,

    /// Human-readable job name.
    pub name: String,

    /// Name of the job type to compile with.
    #[serde(rename = "type")]
    pub job_type: String,

    /// Creation time; substituted for `{timestamp}` in output paths.
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tasks: Vec<Task>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        job_type: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            job_type: job_type.into(),
            created,
            settings: Settings::new(),
            tasks: Vec::new(),
        }
    }

    /// Builder-style helper for tests and hosts that assemble jobs in code.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a task. Tasks run in dependency order, not list order,
    /// but producers are always registered before their consumers.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Total number of dependency edges across all tasks.
    pub fn dependency_count(&self) -> usize {
        self.tasks.iter().map(|t| t.dependencies.len()).sum()
    }

    /// Check the structural invariants of the task graph.
    ///
    /// Task ids must be unique and every dependency must name a task
    /// registered earlier in the list, which rules out cycles.
    pub fn validate_graph(&self) -> FarmjobResult<()> {
        let mut positions: HashMap<TaskId, usize> = HashMap::with_capacity(self.tasks.len());
        for (index, task) in self.tasks.iter().enumerate() {
            if positions.insert(task.id(), index).is_some() {
                return Err(FarmjobError::graph(format!(
                    "duplicate task name {:?}",
                    task.name
                )));
            }
        }

        for (index, task) in self.tasks.iter().enumerate() {
            for dep in &task.dependencies {
                match positions.get(dep) {
                    None => {
                        return Err(FarmjobError::graph(format!(
                            "task {:?} depends on unknown task {:?}",
                            task.name,
                            dep.as_str()
                        )))
                    }
                    Some(&producer) if producer >= index => {
                        return Err(FarmjobError::graph(format!(
                            "task {:?} depends on {:?}, which is not registered before it",
                            task.name,
                            dep.as_str()
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    /// Load a job from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> FarmjobResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the job, including any compiled tasks, as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> FarmjobResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn job() -> Job {
        Job::new(
            "0c9e5b9e",
            "shot-010",
            "simple-blender-render",
            Utc.with_ymd_and_hms(2024, 3, 7, 14, 15, 3).unwrap(),
        )
    }

    #[test]
    fn test_validate_graph_accepts_sink_after_producers() {
        let mut job = job();
        let a = Task::new("render-1-3", "blender");
        let b = Task::new("render-4-6", "blender");
        let mut video = Task::new("preview-video", "ffmpeg");
        video.add_dependency(&a);
        video.add_dependency(&b);

        job.add_task(a);
        job.add_task(b);
        job.add_task(video);

        assert!(job.validate_graph().is_ok());
        assert_eq!(job.dependency_count(), 2);
    }

    #[test]
    fn test_validate_graph_rejects_forward_reference() {
        let mut job = job();
        let a = Task::new("render-1", "blender");
        let mut video = Task::new("preview-video", "ffmpeg");
        video.add_dependency(&a);

        job.add_task(video);
        job.add_task(a);

        let err = job.validate_graph().unwrap_err();
        assert!(err.to_string().contains("not registered before it"));
    }

    #[test]
    fn test_validate_graph_rejects_duplicates_and_dangling_edges() {
        let mut job = job();
        job.add_task(Task::new("render-1", "blender"));
        job.add_task(Task::new("render-1", "blender"));
        assert!(job.validate_graph().is_err());

        let mut job = self::job();
        let ghost = Task::new("render-99", "blender");
        let mut video = Task::new("preview-video", "ffmpeg");
        video.add_dependency(&ghost);
        job.add_task(video);
        assert!(job
            .validate_graph()
            .unwrap_err()
            .to_string()
            .contains("unknown task"));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let mut job = job();
        let mut task = Task::new("render-1", "blender");
        let copy = task.clone();
        task.add_dependency(&copy);
        job.add_task(task);
        assert!(job.validate_graph().is_err());
    }

    #[test]
    fn test_job_json_roundtrip() {
        let mut job = job();
        job.settings.insert("frames", "1-10");
        job.settings.insert("fps", 24);
        job.add_task(Task::new("render-1-10", "blender"));

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"type\":\"simple-blender-render\""));
        let parsed: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn test_job_without_tasks_field_loads() {
        let raw = r#"{
            "id": "abc",
            "name": "shot",
            "type": "cycles-optix-gpu",
            "created": "2024-03-07T14:15:03Z",
            "settings": { "frames": "1-3" }
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert!(job.tasks().is_empty());
        assert_eq!(job.settings.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("farmjob_test_job.json");
        let job = job();
        job.save(&path).unwrap();

        let loaded = Job::load(&path).unwrap();
        assert_eq!(loaded, job);

        std::fs::remove_file(&path).ok();
    }
}
