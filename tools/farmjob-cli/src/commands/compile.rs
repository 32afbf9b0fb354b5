//! Compile a job file into a task graph.

use std::path::PathBuf;

use farmjob_common::config::AppConfig;
use farmjob_compiler::Compiler;

pub fn run(
    path: PathBuf,
    job_type: Option<String>,
    output: Option<PathBuf>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let mut job = super::load_job(&path)?;
    let compiler = Compiler::with_builtin_job_types(config.compiler.clone());
    super::compile_job(&compiler, &mut job, job_type.as_deref())?;

    match output {
        Some(out) => {
            job.save(&out)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", out.display()))?;
            eprintln!(
                "Compiled {} ({}) into {} task(s): {}",
                job.name,
                job.job_type,
                job.tasks().len(),
                out.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&job)?),
    }

    Ok(())
}
