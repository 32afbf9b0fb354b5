//! Job compilation: settings in, task graph out.

use farmjob_common::config::CompilerConfig;
use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::{Command, FramesToVideoCommand, Job, Settings, Task};

use crate::catalog;
use crate::compose::{split_cli_args, ArgumentComposer, RenderRequest};
use crate::frames::FrameSet;
use crate::job_type::{AssemblyPolicy, JobType, JobTypeRegistry, OutputPathPolicy};
use crate::lifecycle;
use crate::path_template::PlaceholderResolver;
use crate::paths;

pub const RENDER_OUTPUT_PATH: &str = "render_output_path";

const RENDER_TASK_TYPE: &str = "blender";
const VIDEO_TASK_TYPE: &str = "ffmpeg";
const VIDEO_TASK_NAME: &str = "preview-video";

/// Compiles jobs against a set of job types.
///
/// Holds only immutable definitions, so one instance can serve any number
/// of compilations from any thread.
#[derive(Debug)]
pub struct Compiler {
    registry: JobTypeRegistry,
    config: CompilerConfig,
    resolver: PlaceholderResolver,
}

impl Compiler {
    pub fn new(registry: JobTypeRegistry, config: CompilerConfig) -> Self {
        let resolver = PlaceholderResolver::new(config.timestamp_zone);
        Self {
            registry,
            config,
            resolver,
        }
    }

    /// A compiler over the built-in job types.
    pub fn with_builtin_job_types(config: CompilerConfig) -> Self {
        Self::new(catalog::builtin(), config)
    }

    pub fn registry(&self) -> &JobTypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `job` with the job type named by `job.job_type`.
    pub fn compile(&self, job: &mut Job) -> FarmjobResult<()> {
        let job_type = self.registry.get(&job.job_type)?;
        self.compile_with(job, job_type)
    }

    /// Compile `job` with an explicit job type.
    ///
    /// On success the resolved output path is written back into the job's
    /// settings and the tasks are appended. On failure the job is left
    /// exactly as it was.
    pub fn compile_with(&self, job: &mut Job, job_type: &JobType) -> FarmjobResult<()> {
        tracing::info!(
            job = %job.name,
            job_id = %job.id,
            job_type = %job_type.name,
            "Job submitted"
        );

        let mut settings = job.settings.clone();
        let defaults = lifecycle::apply_defaults(&mut settings, &job_type.settings);
        if defaults > 0 {
            tracing::debug!(count = defaults, "Applied setting defaults");
        }
        lifecycle::validate_required(&settings, &job_type.settings)?;
        lifecycle::validate_types(&settings, &job_type.settings)?;

        let format = settings.require_str("format")?.to_string();
        if !job_type.allows_format(&format) {
            return Err(FarmjobError::config(format!(
                "This job type only renders images, and not \"{format}\""
            )));
        }

        let render_output = self.render_output_path(job, job_type, &settings)?;
        let render_dir = paths::dirname(&render_output);
        settings.insert(RENDER_OUTPUT_PATH, render_output.clone());

        let frame_set = FrameSet::parse(settings.require_str("frames")?)?;
        let chunk_size = self.chunk_size(job_type, &settings)?;
        let chunks = frame_set.chunks(chunk_size);

        let composer = self.composer(job_type, &settings, &render_dir, &render_output, &format)?;
        let mut tasks = Vec::with_capacity(chunks.len() + 1);
        for chunk in &chunks {
            let mut task = Task::new(
                format!("{}-{}", job_type.task_prefix, chunk),
                RENDER_TASK_TYPE,
            );
            for command in composer.compose(chunk).into_commands() {
                task.add_command(command);
            }
            tracing::debug!(task = %task.name, commands = task.commands.len(), "Authored render task");
            tasks.push(task);
        }

        if let Some(policy) = &job_type.assembly {
            if let Some(mut video) =
                self.video_task(policy, &settings, &frame_set, &format, &render_dir)?
            {
                for render in &tasks {
                    video.add_dependency(render);
                }
                tasks.push(video);
            }
        }

        lifecycle::cleanup(&mut settings, &job_type.cleanup_keys);

        let task_count = tasks.len();
        job.settings = settings;
        for task in tasks {
            job.add_task(task);
        }

        tracing::info!(
            job = %job.name,
            tasks = task_count,
            chunks = chunks.len(),
            chunk_size,
            render_output = %render_output,
            "Job compiled"
        );
        Ok(())
    }

    fn render_output_path(
        &self,
        job: &Job,
        job_type: &JobType,
        settings: &Settings,
    ) -> FarmjobResult<String> {
        let template = match &job_type.output_path {
            OutputPathPolicy::FromSetting => settings.require_str(RENDER_OUTPUT_PATH)?.to_string(),
            OutputPathPolicy::BesideBlendfile { subdir, pattern } => {
                let blend_dir = paths::dirname(settings.require_str("blendfile")?);
                paths::join(&paths::join(&blend_dir, subdir), pattern)
            }
        };
        self.resolver.resolve(&template, job)
    }

    fn chunk_size(&self, job_type: &JobType, settings: &Settings) -> FarmjobResult<u32> {
        let size = match job_type.fixed_chunk_size {
            Some(fixed) => i64::from(fixed),
            None => settings
                .get_i64("chunk_size")?
                .unwrap_or_else(|| i64::from(self.config.default_chunk_size)),
        };
        if size < 1 {
            return Err(FarmjobError::input(format!(
                "chunk size must be at least 1, got {size}"
            )));
        }
        Ok(u32::try_from(size).unwrap_or(u32::MAX))
    }

    fn composer(
        &self,
        job_type: &JobType,
        settings: &Settings,
        render_dir: &str,
        render_output: &str,
        format: &str,
    ) -> FarmjobResult<ArgumentComposer> {
        let mut payloads = job_type.payloads.clone();
        if let Some(toggles) = &job_type.feature_toggles {
            payloads.extend(toggles.payload(settings)?);
        }

        let request = RenderRequest {
            blendfile: settings.require_str("blendfile")?,
            render_dir,
            render_output,
            format,
            scene: settings.get_str("scene")?,
            args_before: split_cli_args(
                "blender_args_before",
                settings.get_str("blender_args_before")?,
            )?,
            args_after: split_cli_args(
                "blender_args_after",
                settings.get_str("blender_args_after")?,
            )?,
        };

        ArgumentComposer::new(
            &job_type.engine,
            &payloads,
            &job_type.env,
            &self.config,
            request,
        )
    }

    /// The preview-video task, or `None` when the output cannot be assembled.
    fn video_task(
        &self,
        policy: &AssemblyPolicy,
        settings: &Settings,
        frame_set: &FrameSet,
        format: &str,
        render_dir: &str,
    ) -> FarmjobResult<Option<Task>> {
        let needs_previews = policy.needs_previews(format);
        if needs_previews && !settings.get_bool("has_previews")? {
            tracing::info!(format, "Not authoring video task, encoder cannot read render output");
            return Ok(None);
        }
        let fps = match settings.get_f64("fps")? {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => {
                tracing::info!("Not authoring video task, no FPS known");
                return Ok(None);
            }
        };

        let frames = settings.require_str("frames")?;
        let frames = if frames.contains(',') {
            format!("{}-{}", frame_set.first(), frame_set.last())
        } else {
            frames.trim().to_string()
        };

        let blendfile = settings.require_str("blendfile")?;
        let stem = paths::stem(blendfile).replacen(".flamenco", "", 1);
        let extension = if needs_previews {
            policy.preview_extension.clone()
        } else {
            settings.require_str("image_file_extension")?.to_string()
        };

        let video = &self.config.video;
        let mut task = Task::new(VIDEO_TASK_NAME, VIDEO_TASK_TYPE);
        task.add_command(Command::FramesToVideo(FramesToVideoCommand {
            exe: video.exe.clone(),
            fps,
            input_glob: paths::join(render_dir, &format!("*{extension}")),
            output_file: paths::join(render_dir, &format!("{stem}-{frames}.mp4")),
            args: vec![
                "-c:v".to_string(),
                video.codec.clone(),
                "-crf".to_string(),
                video.crf.to_string(),
                "-g".to_string(),
                video.gop.to_string(),
                "-vf".to_string(),
                video.pad_filter.clone(),
                "-pix_fmt".to_string(),
                video.pixel_format.clone(),
                "-r".to_string(),
                fps.to_string(),
                "-y".to_string(),
            ],
        }));

        tracing::info!(format, fps, "Creating output video");
        Ok(Some(task))
    }
}
