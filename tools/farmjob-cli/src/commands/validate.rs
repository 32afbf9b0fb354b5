//! Compile a copy of a job and report on the resulting task graph.

use std::path::PathBuf;

use farmjob_common::config::AppConfig;
use farmjob_compiler::Compiler;

pub fn run(path: PathBuf, job_type: Option<String>, config: &AppConfig) -> anyhow::Result<()> {
    println!("Validating job at: {}", path.display());

    let mut job = super::load_job(&path)?;
    let compiler = Compiler::with_builtin_job_types(config.compiler.clone());
    super::compile_job(&compiler, &mut job, job_type.as_deref())?;

    println!("  Name: {}", job.name);
    println!("  Type: {}", job.job_type);
    if let Ok(Some(output)) = job.settings.get_str("render_output_path") {
        println!("  Render output: {output}");
    }
    println!("  Tasks: {}", job.tasks().len());
    for task in job.tasks() {
        println!(
            "    {:<24} {:<8} {} command(s), {} dependenc{}",
            task.name,
            task.task_type,
            task.commands.len(),
            task.dependencies.len(),
            if task.dependencies.len() == 1 { "y" } else { "ies" }
        );
    }
    println!("  Dependency edges: {}", job.dependency_count());

    match job.validate_graph() {
        Ok(()) => println!("\nTask graph is valid."),
        Err(e) => {
            println!("\nTask graph is invalid: {e}");
            anyhow::bail!("task graph validation failed");
        }
    }

    Ok(())
}
