//! Render command composition.
//!
//! Everything that does not depend on the frame chunk (payload embedding,
//! output flags, caller arguments) is computed once per job by
//! [`ArgumentComposer::new`]; [`ArgumentComposer::compose`] only appends the
//! frame-selection flags.

use std::collections::BTreeMap;

use farmjob_common::config::CompilerConfig;
use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::{Command, RenderCommand};

use crate::frames::FrameChunk;
use crate::paths;
use crate::payload::ConfigurationPayload;

/// Spelling of the output path/format flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFlagStyle {
    /// `--render-output <path> --render-format <fmt>`
    Long,
    /// `-o <path> -F <fmt>`
    Short,
}

/// What the output flag points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNaming {
    /// The basename of the resolved output path, inside the render dir.
    TemplateBasename,
    /// A fixed file prefix inside the render dir, e.g. `frame_`.
    Prefix(String),
    /// The resolved output path exactly as it is.
    FullPath,
}

/// How frames are selected on the engine command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSelection {
    /// `--render-frame 1..4` for every chunk.
    RenderFrame,
    /// `-f 1` for single frames, `-s 1 -e 4 -a` for ranges.
    StartEndAnimate,
}

/// Per-job-type conventions for invoking the render engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    /// Engine invocation flags; `None` uses the configured placeholder.
    pub exe_args: Option<String>,
    pub output_flags: OutputFlagStyle,
    pub output_naming: OutputNaming,
    pub frame_selection: FrameSelection,
    pub pass_scene: bool,
    pub create_render_dir: bool,
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            exe_args: None,
            output_flags: OutputFlagStyle::Long,
            output_naming: OutputNaming::TemplateBasename,
            frame_selection: FrameSelection::RenderFrame,
            pass_scene: false,
            create_render_dir: false,
        }
    }
}

/// Resolved per-job inputs of a render command.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest<'a> {
    pub blendfile: &'a str,
    pub render_dir: &'a str,
    pub render_output: &'a str,
    pub format: &'a str,
    pub scene: Option<&'a str>,
    pub args_before: Vec<String>,
    pub args_after: Vec<String>,
}

/// Commands of one render task: setup first, render last.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInvocation {
    pub setup: Vec<Command>,
    pub render: Command,
}

impl RenderInvocation {
    pub fn into_commands(self) -> Vec<Command> {
        let mut commands = self.setup;
        commands.push(self.render);
        commands
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentComposer {
    exe: String,
    exe_args: String,
    blendfile: String,
    args_before: Vec<String>,
    invariant_args: Vec<String>,
    setup: Vec<Command>,
    env: BTreeMap<String, String>,
    frame_selection: FrameSelection,
}

impl ArgumentComposer {
    pub fn new(
        profile: &EngineProfile,
        payloads: &[ConfigurationPayload],
        env: &BTreeMap<String, String>,
        config: &CompilerConfig,
        request: RenderRequest<'_>,
    ) -> FarmjobResult<Self> {
        let mut setup = Vec::new();
        if profile.create_render_dir {
            setup.push(Command::exec("mkdir", ["-p", request.render_dir]));
        }

        let mut args = Vec::new();
        if profile.pass_scene {
            if let Some(scene) = request.scene.filter(|s| !s.is_empty()) {
                args.extend(["--scene".to_string(), scene.to_string()]);
            }
        }

        let target = match &profile.output_naming {
            OutputNaming::TemplateBasename => {
                paths::join(request.render_dir, paths::basename(request.render_output))
            }
            OutputNaming::Prefix(prefix) => paths::join(request.render_dir, prefix),
            OutputNaming::FullPath => request.render_output.to_string(),
        };
        let (output_flag, format_flag) = match profile.output_flags {
            OutputFlagStyle::Long => ("--render-output", "--render-format"),
            OutputFlagStyle::Short => ("-o", "-F"),
        };
        args.extend([
            output_flag.to_string(),
            target,
            format_flag.to_string(),
            request.format.to_string(),
        ]);

        for payload in payloads {
            let embedded = payload.embed(request.render_dir)?;
            setup.extend(embedded.setup);
            args.extend(embedded.args);
        }

        args.extend(request.args_after);

        Ok(Self {
            exe: config.blender_exe.clone(),
            exe_args: profile
                .exe_args
                .clone()
                .unwrap_or_else(|| config.blender_args_placeholder.clone()),
            blendfile: request.blendfile.to_string(),
            args_before: request.args_before,
            invariant_args: args,
            setup,
            env: env.clone(),
            frame_selection: profile.frame_selection,
        })
    }

    /// Arguments shared by every chunk of the job.
    pub fn invariant_args(&self) -> &[String] {
        &self.invariant_args
    }

    pub fn compose(&self, chunk: &FrameChunk) -> RenderInvocation {
        let mut args = self.invariant_args.clone();
        args.extend(frame_flags(self.frame_selection, chunk));

        RenderInvocation {
            setup: self.setup.clone(),
            render: Command::BlenderRender(RenderCommand {
                exe: self.exe.clone(),
                exe_args: self.exe_args.clone(),
                args_before: self.args_before.clone(),
                blendfile: self.blendfile.clone(),
                args,
                env: self.env.clone(),
            }),
        }
    }
}

/// Frame-selection flags for one chunk.
pub fn frame_flags(selection: FrameSelection, chunk: &FrameChunk) -> Vec<String> {
    match (selection, chunk) {
        (FrameSelection::RenderFrame, chunk) => vec!["--render-frame".to_string(), chunk.dotted()],
        (FrameSelection::StartEndAnimate, FrameChunk::Single(frame)) => {
            vec!["-f".to_string(), frame.to_string()]
        }
        (FrameSelection::StartEndAnimate, FrameChunk::Range { start, end }) => vec![
            "-s".to_string(),
            start.to_string(),
            "-e".to_string(),
            end.to_string(),
            "-a".to_string(),
        ],
    }
}

/// Split a caller-supplied argument string the way a POSIX shell would.
///
/// `key` names the setting in the error message.
pub fn split_cli_args(key: &str, raw: Option<&str>) -> FarmjobResult<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => shell_words::split(raw)
            .map_err(|e| FarmjobError::config(format!("cannot split {key} setting: {e}"))),
    }
}
