//! Built-in job types.

use std::collections::{BTreeMap, BTreeSet};

use farmjob_job_model::{SettingDef, Visibility};

use crate::compose::{EngineProfile, FrameSelection, OutputFlagStyle, OutputNaming};
use crate::job_type::{AssemblyPolicy, FeatureToggles, JobType, JobTypeRegistry, OutputPathPolicy};
use crate::payload::ConfigurationPayload;

const OPTIX_DEVICES: &str = include_str!("../payloads/optix_devices.py");
const CUDA_DEVICES: &str = include_str!("../payloads/cuda_devices.py");
const EEVEE_GPU: &str = include_str!("../payloads/eevee_gpu.py");
const WORKBENCH: &str = include_str!("../payloads/workbench.py");
const DIAGNOSE_CUDA: &str = include_str!("../payloads/diagnose_cuda.py");

const GPU_SCENE_DEVICE: &str = "import bpy; bpy.context.scene.cycles.device = 'GPU'";
const RENDER_START_TIME: &str =
    "import time; print(f'farmjob: render started {time.strftime(\"%Y-%m-%d %H:%M:%S\")}')";

/// Formats that render straight to video.
const VIDEO_FORMATS: [&str; 3] = ["FFMPEG", "AVI_RAW", "AVI_JPEG"];

/// Image formats the video encoder cannot read.
const FFMPEG_INCOMPATIBLE_FORMATS: [&str; 4] =
    ["EXR", "MULTILAYER", "OPEN_EXR", "OPEN_EXR_MULTILAYER"];

pub const SIMPLE_BLENDER_RENDER: &str = "simple-blender-render";
pub const CYCLES_OPTIX_GPU: &str = "cycles-optix-gpu";
pub const OPTIX_GPU_RENDER: &str = "optix-gpu-render";
pub const CUDA_GPU_RENDER: &str = "cuda-gpu-render";
pub const EEVEE_GPU_RENDER: &str = "eevee-gpu-render";
pub const WORKBENCH_RENDER: &str = "workbench-render";
pub const DIAGNOSE_CUDA_RENDER: &str = "diagnose-cuda-render";

/// Registry holding every built-in job type.
pub fn builtin() -> JobTypeRegistry {
    [
        simple_blender_render(),
        cycles_optix_gpu(),
        optix_gpu_render(),
        cuda_gpu_render(),
        eevee_gpu_render(),
        workbench_render(),
        diagnose_cuda_render(),
    ]
    .into_iter()
    .collect()
}

fn string_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn frames_setting() -> SettingDef {
    SettingDef::string("frames")
        .required()
        .derived("f'{C.scene.frame_start}-{C.scene.frame_end}'")
        .describe("Frame range to render. Examples: '47', '1-30', '3, 5-10, 47-327'")
}

fn chunk_size_setting() -> SettingDef {
    SettingDef::int32("chunk_size")
        .with_default(1)
        .visible(Visibility::Submission)
        .describe("Number of frames to render in one render task")
}

fn render_output_path_setting(eval: &str) -> SettingDef {
    SettingDef::string("render_output_path")
        .subtype("file_path")
        .read_only()
        .derived(eval)
        .describe("Final file path of where render output will be saved")
}

fn blendfile_setting() -> SettingDef {
    SettingDef::string("blendfile")
        .required()
        .visible(Visibility::Web)
        .describe("Path of the blend file to render")
}

fn format_setting() -> SettingDef {
    SettingDef::string("format")
        .required()
        .derived("C.scene.render.image_settings.file_format")
        .visible(Visibility::Web)
}

fn image_file_extension_setting() -> SettingDef {
    SettingDef::string("image_file_extension")
        .required()
        .derived("C.scene.render.file_extension")
        .visible(Visibility::Hidden)
        .describe("File extension used when rendering images")
}

fn scene_setting() -> SettingDef {
    SettingDef::string("scene")
        .required()
        .derived("C.scene.name")
        .visible(Visibility::Web)
        .describe("Name of the scene to render")
}

fn preview_settings() -> [SettingDef; 2] {
    [
        SettingDef::float("fps")
            .derived("C.scene.render.fps / C.scene.render.fps_base")
            .visible(Visibility::Hidden),
        SettingDef::bool("has_previews")
            .derived("C.scene.render.image_settings.use_preview")
            .visible(Visibility::Hidden)
            .describe("Whether the engine writes preview images next to the output"),
    ]
}

/// `render_output_root` and `add_path_components`, from which the host
/// derives `render_output_path`.
fn output_root_settings() -> [SettingDef; 3] {
    [
        SettingDef::string("render_output_root")
            .required()
            .subtype("dir_path")
            .visible(Visibility::Submission)
            .describe("Base directory of render output; job-specific parts are appended"),
        SettingDef::int32("add_path_components")
            .required()
            .with_default(0)
            .visible(Visibility::Submission)
            .describe("Number of blend file path components to use in the render output path"),
        render_output_path_setting(
            "str(Path(abspath(settings.render_output_root), \
             last_n_dir_parts(settings.add_path_components), jobname, '{timestamp}', '######'))",
        ),
    ]
}

fn cli_args_settings() -> [SettingDef; 2] {
    [
        SettingDef::string("blender_args_before")
            .label("Blender CLI args: Before")
            .describe("CLI arguments placed before the blend file name"),
        SettingDef::string("blender_args_after")
            .label("After")
            .describe("CLI arguments placed after the blend file name"),
    ]
}

const CLI_ARGS_KEYS: [&str; 2] = ["blender_args_before", "blender_args_after"];

fn assembly() -> AssemblyPolicy {
    AssemblyPolicy {
        incompatible_formats: string_set(&FFMPEG_INCOMPATIBLE_FORMATS),
        preview_extension: ".jpg".to_string(),
    }
}

/// Schema shared by the GPU job types that render without a preview video.
fn gpu_settings(output_eval: &str) -> Vec<SettingDef> {
    let mut settings = vec![
        frames_setting(),
        chunk_size_setting(),
        render_output_path_setting(output_eval),
    ];
    settings.extend(cli_args_settings());
    settings.extend([
        blendfile_setting(),
        format_setting(),
        image_file_extension_setting(),
        scene_setting(),
    ]);
    settings
}

const BESIDE_BLENDFILE_EVAL: &str = "str(Path(bpy.path.abspath('//'), 'render', '######'))";

fn beside_blendfile() -> OutputPathPolicy {
    OutputPathPolicy::BesideBlendfile {
        subdir: "render".to_string(),
        pattern: "######".to_string(),
    }
}

fn frame_prefix_engine(exe_args: &str) -> EngineProfile {
    EngineProfile {
        exe_args: Some(exe_args.to_string()),
        output_flags: OutputFlagStyle::Short,
        output_naming: OutputNaming::Prefix("frame_".to_string()),
        frame_selection: FrameSelection::StartEndAnimate,
        pass_scene: false,
        create_render_dir: true,
    }
}

pub fn simple_blender_render() -> JobType {
    let mut settings = vec![frames_setting(), chunk_size_setting()];
    settings.extend(output_root_settings());
    settings.push(blendfile_setting());
    settings.extend(preview_settings());
    settings.extend([format_setting(), image_file_extension_setting(), scene_setting()]);

    JobType {
        description: "Render a sequence of frames, and create a preview video file".to_string(),
        settings,
        disallowed_formats: string_set(&VIDEO_FORMATS),
        engine: EngineProfile {
            pass_scene: true,
            ..EngineProfile::default()
        },
        assembly: Some(assembly()),
        ..JobType::new(SIMPLE_BLENDER_RENDER, "Simple Blender Render")
    }
}

pub fn cycles_optix_gpu() -> JobType {
    let mut settings = vec![frames_setting(), chunk_size_setting()];
    settings.extend(output_root_settings());
    settings.extend([
        SettingDef::bool("experimental_gp3")
            .label("Experimental: GPv3")
            .describe("Experimental flag: Grease Pencil 3"),
        SettingDef::bool("experimental_new_anim")
            .label("Experimental: Baklava")
            .describe("Experimental flag: new animation data-block"),
    ]);
    settings.extend(cli_args_settings());
    settings.push(blendfile_setting());
    settings.extend(preview_settings());
    settings.extend([format_setting(), image_file_extension_setting()]);

    let mut cleanup_keys: Vec<String> = CLI_ARGS_KEYS.iter().map(|s| s.to_string()).collect();
    cleanup_keys.extend(["experimental_gp3".to_string(), "experimental_new_anim".to_string()]);

    JobType {
        description: "OptiX GPU rendering with experimental feature toggles and extra CLI \
                      arguments"
            .to_string(),
        settings,
        disallowed_formats: string_set(&VIDEO_FORMATS),
        payloads: vec![
            ConfigurationPayload::inline_plain("optix-devices", OPTIX_DEVICES),
            ConfigurationPayload::inline_plain("gpu-scene-device", GPU_SCENE_DEVICE),
        ],
        feature_toggles: Some(FeatureToggles {
            prelude: "import bpy\n\nexp_prefs = bpy.context.preferences.experimental\n"
                .to_string(),
            toggles: vec![
                (
                    "experimental_gp3".to_string(),
                    "exp_prefs.use_grease_pencil_version3 = True".to_string(),
                ),
                (
                    "experimental_new_anim".to_string(),
                    "exp_prefs.use_animation_baklava = True".to_string(),
                ),
            ],
        }),
        assembly: Some(assembly()),
        cleanup_keys,
        ..JobType::new(CYCLES_OPTIX_GPU, "Cycles OptiX GPU")
    }
}

pub fn optix_gpu_render() -> JobType {
    JobType {
        description: "OptiX GPU rendering of a frame sequence without a preview video".to_string(),
        settings: gpu_settings(BESIDE_BLENDFILE_EVAL),
        engine: EngineProfile {
            exe_args: Some("-b -y -E CYCLES".to_string()),
            pass_scene: true,
            create_render_dir: true,
            ..EngineProfile::default()
        },
        payloads: vec![
            ConfigurationPayload::inline_plain("optix-devices", OPTIX_DEVICES),
            ConfigurationPayload::inline_plain("gpu-scene-device", GPU_SCENE_DEVICE),
        ],
        cleanup_keys: CLI_ARGS_KEYS.iter().map(|s| s.to_string()).collect(),
        ..JobType::new(OPTIX_GPU_RENDER, "OptiX GPU Render (No Video)")
    }
}

pub fn cuda_gpu_render() -> JobType {
    JobType {
        description: "CUDA GPU rendering of a frame sequence without a preview video".to_string(),
        settings: gpu_settings(BESIDE_BLENDFILE_EVAL),
        output_path: beside_blendfile(),
        engine: frame_prefix_engine("-b -y -E CYCLES"),
        payloads: vec![ConfigurationPayload::inline_base64(
            "cuda-devices",
            CUDA_DEVICES,
        )],
        cleanup_keys: CLI_ARGS_KEYS.iter().map(|s| s.to_string()).collect(),
        ..JobType::new(CUDA_GPU_RENDER, "CUDA GPU Render (No Video)")
    }
}

pub fn eevee_gpu_render() -> JobType {
    let env = [
        ("__NV_PRIME_RENDER_OFFLOAD", "1"),
        ("__GLX_VENDOR_LIBRARY_NAME", "nvidia"),
        ("NVIDIA_VISIBLE_DEVICES", "all"),
        ("NVIDIA_DRIVER_CAPABILITIES", "graphics,compute,utility"),
        ("CUDA_VISIBLE_DEVICES", "0"),
    ];

    JobType {
        description: "Eevee Next rendering of a frame sequence without a preview video"
            .to_string(),
        settings: gpu_settings(BESIDE_BLENDFILE_EVAL),
        output_path: beside_blendfile(),
        engine: frame_prefix_engine("-b -y -E BLENDER_EEVEE_NEXT"),
        payloads: vec![ConfigurationPayload::file(
            "eevee-gpu",
            "eevee_config.py",
            EEVEE_GPU,
        )],
        env: env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        cleanup_keys: CLI_ARGS_KEYS.iter().map(|s| s.to_string()).collect(),
        ..JobType::new(EEVEE_GPU_RENDER, "Eevee Next GPU Render (No Video)")
    }
}

pub fn workbench_render() -> JobType {
    JobType {
        description: "Workbench rendering of a frame sequence without a preview video".to_string(),
        settings: gpu_settings(BESIDE_BLENDFILE_EVAL),
        output_path: beside_blendfile(),
        engine: frame_prefix_engine("-b -y -E BLENDER_WORKBENCH"),
        payloads: vec![ConfigurationPayload::file(
            "workbench",
            "workbench_config.py",
            WORKBENCH,
        )],
        cleanup_keys: CLI_ARGS_KEYS.iter().map(|s| s.to_string()).collect(),
        ..JobType::new(WORKBENCH_RENDER, "Workbench Render (No Video)")
    }
}

pub fn diagnose_cuda_render() -> JobType {
    JobType {
        description: "Render one frame per task with detailed CUDA diagnostics".to_string(),
        settings: vec![
            frames_setting(),
            blendfile_setting(),
            format_setting(),
            render_output_path_setting(BESIDE_BLENDFILE_EVAL),
        ],
        engine: EngineProfile {
            exe_args: Some("-b -y -E CYCLES".to_string()),
            output_naming: OutputNaming::FullPath,
            create_render_dir: true,
            ..EngineProfile::default()
        },
        payloads: vec![
            ConfigurationPayload::inline_base64("diagnose-cuda", DIAGNOSE_CUDA),
            ConfigurationPayload::inline_plain("render-start-time", RENDER_START_TIME),
        ],
        fixed_chunk_size: Some(1),
        task_prefix: "diagnose-render".to_string(),
        ..JobType::new(DIAGNOSE_CUDA_RENDER, "Diagnose CUDA Rendering")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::EmbeddingStrategy;

    #[test]
    fn test_builtin_registry_names() {
        let registry = builtin();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            [
                CUDA_GPU_RENDER,
                CYCLES_OPTIX_GPU,
                DIAGNOSE_CUDA_RENDER,
                EEVEE_GPU_RENDER,
                OPTIX_GPU_RENDER,
                SIMPLE_BLENDER_RENDER,
                WORKBENCH_RENDER,
            ]
        );
    }

    #[test]
    fn test_every_job_type_requires_frames_blendfile_and_format() {
        for job_type in builtin().iter() {
            for key in ["frames", "blendfile", "format"] {
                let def = job_type
                    .setting(key)
                    .unwrap_or_else(|| panic!("{} lacks {key}", job_type.name));
                assert!(def.required, "{}: {key} should be required", job_type.name);
            }
        }
    }

    #[test]
    fn test_cleanup_keys_are_optional_settings() {
        for job_type in builtin().iter() {
            for key in &job_type.cleanup_keys {
                let def = job_type.setting(key).unwrap();
                assert!(!def.required, "{}: {key}", job_type.name);
            }
        }
    }

    #[test]
    fn test_payload_strategies() {
        let registry = builtin();
        let strategies = |name: &str| -> Vec<EmbeddingStrategy> {
            registry
                .get(name)
                .unwrap()
                .payloads
                .iter()
                .map(|p| p.strategy.clone())
                .collect()
        };

        assert_eq!(strategies(CUDA_GPU_RENDER), [EmbeddingStrategy::InlineBase64]);
        assert_eq!(
            strategies(EEVEE_GPU_RENDER),
            [EmbeddingStrategy::File {
                file_name: "eevee_config.py".to_string()
            }]
        );
        assert_eq!(
            strategies(CYCLES_OPTIX_GPU),
            [EmbeddingStrategy::InlinePlain, EmbeddingStrategy::InlinePlain]
        );
        assert!(strategies(SIMPLE_BLENDER_RENDER).is_empty());
    }

    #[test]
    fn test_payload_sources_are_embedded() {
        assert!(OPTIX_DEVICES.contains("OPTIX"));
        assert!(CUDA_DEVICES.contains("CUDA"));
        assert!(EEVEE_GPU.contains("BLENDER_EEVEE_NEXT"));
        assert!(WORKBENCH.contains("BLENDER_WORKBENCH"));
        assert!(DIAGNOSE_CUDA.contains("diagnostic"));
    }

    #[test]
    fn test_only_image_job_types_assemble_video() {
        let registry = builtin();
        let with_assembly: Vec<_> = registry
            .iter()
            .filter(|t| t.assembly.is_some())
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(with_assembly, [CYCLES_OPTIX_GPU, SIMPLE_BLENDER_RENDER]);
        for name in with_assembly {
            assert!(!registry.get(name).unwrap().allows_format("FFMPEG"));
        }
    }
}
