//! Job-type definitions and the registry the compiler looks them up in.

use std::collections::{BTreeMap, BTreeSet};

use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::{SettingDef, Settings};

use crate::compose::EngineProfile;
use crate::payload::ConfigurationPayload;

/// Where the render output path comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPathPolicy {
    /// The `render_output_path` setting, resolved as a template.
    FromSetting,
    /// `<blend file dir>/<subdir>/<pattern>`, resolved as a template.
    BesideBlendfile { subdir: String, pattern: String },
}

/// Experimental engine features switched on by boolean settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureToggles {
    /// Source emitted once before any toggle line.
    pub prelude: String,
    /// `(setting key, source line)` pairs.
    pub toggles: Vec<(String, String)>,
}

impl FeatureToggles {
    /// One payload enabling every toggle whose setting is true, or `None`
    /// when all are off.
    pub fn payload(&self, settings: &Settings) -> FarmjobResult<Option<ConfigurationPayload>> {
        let mut lines = Vec::new();
        for (key, line) in &self.toggles {
            if settings.get_bool(key)? {
                lines.push(line.as_str());
            }
        }
        if lines.is_empty() {
            return Ok(None);
        }

        let mut source = self.prelude.clone();
        for line in lines {
            source.push_str(line);
            source.push('\n');
        }
        Ok(Some(ConfigurationPayload::inline_base64(
            "experimental-features",
            source,
        )))
    }
}

/// Preview-video assembly after all renders finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPolicy {
    /// Output formats the encoder cannot read; these need preview images.
    pub incompatible_formats: BTreeSet<String>,
    /// Extension of the preview images written alongside such formats.
    pub preview_extension: String,
}

impl AssemblyPolicy {
    pub fn needs_previews(&self, format: &str) -> bool {
        self.incompatible_formats.contains(format)
    }
}

/// Everything the compiler needs to know about one kind of job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobType {
    pub name: String,
    pub label: String,
    pub description: String,
    pub settings: Vec<SettingDef>,
    /// Output formats this job type refuses.
    pub disallowed_formats: BTreeSet<String>,
    pub output_path: OutputPathPolicy,
    pub engine: EngineProfile,
    pub payloads: Vec<ConfigurationPayload>,
    pub feature_toggles: Option<FeatureToggles>,
    /// Environment overrides for the render process.
    pub env: BTreeMap<String, String>,
    pub assembly: Option<AssemblyPolicy>,
    /// Optional settings removed after compilation when left empty.
    pub cleanup_keys: Vec<String>,
    /// Overrides the `chunk_size` setting when set.
    pub fixed_chunk_size: Option<u32>,
    pub task_prefix: String,
}

impl JobType {
    /// A job type with no payloads, no assembly and default engine flags.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: String::new(),
            settings: Vec::new(),
            disallowed_formats: BTreeSet::new(),
            output_path: OutputPathPolicy::FromSetting,
            engine: EngineProfile::default(),
            payloads: Vec::new(),
            feature_toggles: None,
            env: BTreeMap::new(),
            assembly: None,
            cleanup_keys: Vec::new(),
            fixed_chunk_size: None,
            task_prefix: "render".to_string(),
        }
    }

    pub fn setting(&self, key: &str) -> Option<&SettingDef> {
        self.settings.iter().find(|d| d.key == key)
    }

    pub fn allows_format(&self, format: &str) -> bool {
        !self.disallowed_formats.contains(format)
    }
}

/// Job types by name.
#[derive(Debug, Clone, Default)]
pub struct JobTypeRegistry {
    types: BTreeMap<String, JobType>,
}

impl JobTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job type, replacing any existing one with the same name.
    pub fn register(&mut self, job_type: JobType) -> Option<JobType> {
        self.types.insert(job_type.name.clone(), job_type)
    }

    pub fn get(&self, name: &str) -> FarmjobResult<&JobType> {
        self.types
            .get(name)
            .ok_or_else(|| FarmjobError::config(format!("unknown job type {name:?}")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<JobType> for JobTypeRegistry {
    fn from_iter<I: IntoIterator<Item = JobType>>(iter: I) -> Self {
        let mut registry = Self::new();
        for job_type in iter {
            registry.register(job_type);
        }
        registry
    }
}
