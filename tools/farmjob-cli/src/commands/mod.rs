pub mod chunk;
pub mod compile;
pub mod config;
pub mod job_types;
pub mod validate;

use std::path::Path;

use farmjob_compiler::Compiler;
use farmjob_job_model::Job;

pub fn load_job(path: &Path) -> anyhow::Result<Job> {
    Job::load(path).map_err(|e| anyhow::anyhow!("Failed to load job {}: {e}", path.display()))
}

/// Compile `job`, optionally against a job type other than its own.
///
/// An override is recorded in the job so the written file says what it was
/// compiled with.
pub fn compile_job(
    compiler: &Compiler,
    job: &mut Job,
    job_type: Option<&str>,
) -> anyhow::Result<()> {
    match job_type {
        Some(name) => {
            let definition = compiler.registry().get(name)?;
            compiler.compile_with(job, definition)?;
            job.job_type = name.to_string();
        }
        None => compiler.compile(job)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use farmjob_common::config::CompilerConfig;

    fn job() -> Job {
        let mut job = Job::new("j", "shot", "simple-blender-render", Utc::now());
        for (key, value) in [
            ("frames", "1-4"),
            ("blendfile", "/jobs/shot/shot.blend"),
            ("format", "PNG"),
            ("image_file_extension", ".png"),
            ("scene", "Scene"),
        ] {
            job.settings.insert(key, value);
        }
        job
    }

    #[test]
    fn test_compile_job_with_override_records_type() {
        let compiler = Compiler::with_builtin_job_types(CompilerConfig::default());
        let mut job = job();
        compile_job(&compiler, &mut job, Some("workbench-render")).unwrap();

        assert_eq!(job.job_type, "workbench-render");
        assert_eq!(job.tasks().len(), 4);
    }

    #[test]
    fn test_compile_job_unknown_override() {
        let compiler = Compiler::with_builtin_job_types(CompilerConfig::default());
        let mut job = job();
        let err = compile_job(&compiler, &mut job, Some("nope")).unwrap_err();
        assert!(err.to_string().contains("unknown job type"));
        assert_eq!(job.job_type, "simple-blender-render");
    }
}
