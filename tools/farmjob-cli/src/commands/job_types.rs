//! List built-in job types or show one type's settings schema.

use farmjob_common::config::AppConfig;
use farmjob_compiler::Compiler;
use farmjob_job_model::SettingValue;

pub fn run(name: Option<&str>, config: &AppConfig) -> anyhow::Result<()> {
    let compiler = Compiler::with_builtin_job_types(config.compiler.clone());
    let registry = compiler.registry();

    let Some(name) = name else {
        println!("Job types:");
        for job_type in registry.iter() {
            println!("  {:<24} {}", job_type.name, job_type.label);
        }
        return Ok(());
    };

    let job_type = registry.get(name)?;
    println!("{} ({})", job_type.label, job_type.name);
    println!("  {}", job_type.description);
    println!();

    println!("Settings:");
    for def in &job_type.settings {
        let default = def
            .default
            .as_ref()
            .map(|v: &SettingValue| format!(" = {v}"))
            .unwrap_or_default();
        let flags = match (def.required, def.is_derived()) {
            (true, true) => " [required, derived]",
            (true, false) => " [required]",
            (false, true) => " [derived]",
            (false, false) => "",
        };
        println!("  {:<24} {:<7}{default}{flags}", def.key, def.kind.to_string());
    }
    println!();

    println!("Engine:");
    println!(
        "  Invocation: {}",
        job_type
            .engine
            .exe_args
            .as_deref()
            .unwrap_or(&compiler.config().blender_args_placeholder)
    );
    for payload in &job_type.payloads {
        println!("  Payload: {} ({:?})", payload.name, payload.strategy);
    }
    if let Some(size) = job_type.fixed_chunk_size {
        println!("  Fixed chunk size: {size}");
    }
    println!(
        "  Preview video: {}",
        if job_type.assembly.is_some() { "yes" } else { "no" }
    );

    Ok(())
}
