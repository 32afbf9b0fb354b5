//! Tasks and the commands they run.
//!
//! A task is the unit the scheduler hands to a worker. Its commands run in
//! order and the task fails as soon as one of them fails. Dependency edges
//! point from the consumer to the producers it waits for.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a task within its job. Derived from the task name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,

    /// Category tag used by the scheduler to pick workers ("blender", "ffmpeg").
    #[serde(rename = "type")]
    pub task_type: String,

    pub commands: Vec<Command>,

    /// Tasks that must complete successfully before this one may start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
}

impl Task {
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            commands: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        TaskId(self.name.clone())
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Declare that this task may only run after `producer` has completed.
    /// Adding the same edge twice is a no-op.
    pub fn add_dependency(&mut self, producer: &Task) {
        let id = producer.id();
        if !self.dependencies.contains(&id) {
            self.dependencies.push(id);
        }
    }

    pub fn depends_on(&self, id: &TaskId) -> bool {
        self.dependencies.contains(id)
    }
}

/// One step of a task, tagged by its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Run an arbitrary executable.
    #[serde(rename = "exec")]
    Exec(ExecCommand),

    /// Run the render engine on a blend file.
    #[serde(rename = "blender-render")]
    BlenderRender(RenderCommand),

    /// Assemble rendered frames into a video file.
    #[serde(rename = "frames-to-video")]
    FramesToVideo(FramesToVideoCommand),
}

impl Command {
    pub fn exec<I, S>(exe: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Exec(ExecCommand {
            exe: exe.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        })
    }

    pub fn as_render(&self) -> Option<&RenderCommand> {
        match self {
            Command::BlenderRender(render) => Some(render),
            _ => None,
        }
    }

    pub fn as_exec(&self) -> Option<&ExecCommand> {
        match self {
            Command::Exec(exec) => Some(exec),
            _ => None,
        }
    }

    pub fn as_frames_to_video(&self) -> Option<&FramesToVideoCommand> {
        match self {
            Command::FramesToVideo(video) => Some(video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCommand {
    pub exe: String,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Parameters of a render-engine invocation.
///
/// The worker runs `exe exeArgs argsBefore blendfile args`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCommand {
    /// Executable or a placeholder the worker resolves (`{blender}`).
    pub exe: String,
    /// Engine-invocation flags as a single string, split by the worker.
    pub exe_args: String,
    pub args_before: Vec<String>,
    pub blendfile: String,
    pub args: Vec<String>,
    /// Environment overrides for the render process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramesToVideoCommand {
    pub exe: String,
    pub fps: f64,
    pub input_glob: String,
    pub output_file: String,
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_is_recorded_once() {
        let render = Task::new("render-1-3", "blender");
        let mut video = Task::new("preview-video", "ffmpeg");

        video.add_dependency(&render);
        video.add_dependency(&render);

        assert_eq!(video.dependencies.len(), 1);
        assert!(video.depends_on(&render.id()));
    }

    #[test]
    fn test_command_wire_format() {
        let mut task = Task::new("render-1", "blender");
        task.add_command(Command::exec("mkdir", ["-p", "/render/out"]));
        task.add_command(Command::BlenderRender(RenderCommand {
            exe: "{blender}".to_string(),
            exe_args: "{blenderArgs}".to_string(),
            args_before: vec![],
            blendfile: "/jobs/shot.blend".to_string(),
            args: vec!["--render-frame".to_string(), "1".to_string()],
            env: BTreeMap::new(),
        }));

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "blender");
        assert_eq!(json["commands"][0]["type"], "exec");
        assert_eq!(json["commands"][0]["args"][1], "/render/out");
        assert_eq!(json["commands"][1]["type"], "blender-render");
        assert_eq!(json["commands"][1]["exeArgs"], "{blenderArgs}");
        assert_eq!(json["commands"][1]["argsBefore"], serde_json::json!([]));
        assert!(json["commands"][1].get("env").is_none());
        assert!(json.get("dependencies").is_none());

        let parsed: Task = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn test_frames_to_video_field_names() {
        let command = Command::FramesToVideo(FramesToVideoCommand {
            exe: "ffmpeg".to_string(),
            fps: 24.0,
            input_glob: "/render/*.png".to_string(),
            output_file: "/render/shot-1-10.mp4".to_string(),
            args: vec!["-y".to_string()],
        });
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["type"], "frames-to-video");
        assert_eq!(json["inputGlob"], "/render/*.png");
        assert_eq!(json["outputFile"], "/render/shot-1-10.mp4");
    }
}
