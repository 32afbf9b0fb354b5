//! `{placeholder}` substitution in output-path templates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use farmjob_common::clock::TimestampZone;
use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::Job;
use regex::{Captures, Regex};

type ResolverFn = Box<dyn Fn(&Job) -> String + Send + Sync>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Maps placeholder names to functions of the job.
///
/// Placeholders without a registered resolver are left in the output as
/// written, so worker-side tokens survive compilation.
pub struct PlaceholderResolver {
    resolvers: BTreeMap<String, ResolverFn>,
}

impl PlaceholderResolver {
    /// A resolver that knows no placeholders.
    pub fn empty() -> Self {
        Self {
            resolvers: BTreeMap::new(),
        }
    }

    /// The built-in set: `{timestamp}` rendered in `zone`.
    pub fn new(zone: TimestampZone) -> Self {
        let mut resolver = Self::empty();
        resolver.register("timestamp", move |job: &Job| zone.format(&job.created));
        resolver
    }

    pub fn register<F>(&mut self, name: impl Into<String>, resolve: F)
    where
        F: Fn(&Job) -> String + Send + Sync + 'static,
    {
        self.resolvers.insert(name.into(), Box::new(resolve));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn resolve(&self, template: &str, job: &Job) -> FarmjobResult<String> {
        if template.is_empty() {
            return Err(FarmjobError::config("empty output path template"));
        }

        let resolved = placeholder_pattern().replace_all(template, |caps: &Captures| {
            match self.resolvers.get(&caps[1]) {
                Some(resolve) => resolve(job),
                None => caps[0].to_string(),
            }
        });
        Ok(resolved.into_owned())
    }
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new(TimestampZone::Local)
    }
}

impl fmt::Debug for PlaceholderResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderResolver")
            .field("placeholders", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolve `template` with the built-in placeholders in the local timezone.
pub fn resolve(template: &str, job: &Job) -> FarmjobResult<String> {
    PlaceholderResolver::default().resolve(template, job)
}

/// Resolve `template` with `{timestamp}` rendered in `zone`.
pub fn resolve_in(template: &str, job: &Job, zone: TimestampZone) -> FarmjobResult<String> {
    PlaceholderResolver::new(zone).resolve(template, job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn job() -> Job {
        Job::new(
            "0c9e5b9e",
            "shot-010",
            "simple-blender-render",
            Utc.with_ymd_and_hms(2024, 3, 7, 14, 15, 3).unwrap(),
        )
    }

    #[test]
    fn test_timestamp_is_substituted_and_unknown_kept() {
        let out = resolve_in(
            "/render/{jobname}/{timestamp}/######",
            &job(),
            TimestampZone::Utc,
        )
        .unwrap();
        assert_eq!(out, "/render/{jobname}/2024-03-07_141503/######");
    }

    #[test]
    fn test_fixed_offset_zone() {
        let zone = TimestampZone::Fixed {
            offset_secs: 10 * 3600,
        };
        let out = resolve_in("{timestamp}", &job(), zone).unwrap();
        assert_eq!(out, "2024-03-08_001503");
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let template = "/render/shot/######.png";
        let once = resolve(template, &job()).unwrap();
        assert_eq!(once, template);
        assert_eq!(resolve(&once, &job()).unwrap(), once);
    }

    #[test]
    fn test_empty_template_is_config_error() {
        assert!(resolve("", &job()).unwrap_err().is_config());
    }

    #[test]
    fn test_custom_placeholder() {
        let mut resolver = PlaceholderResolver::new(TimestampZone::Utc);
        resolver.register("jobname", |job: &Job| job.name.clone());

        let out = resolver
            .resolve("/render/{jobname}/{timestamp}/{frame}", &job())
            .unwrap();
        assert_eq!(out, "/render/shot-010/2024-03-07_141503/{frame}");
        assert_eq!(resolver.names().collect::<Vec<_>>(), ["jobname", "timestamp"]);
    }

    #[test]
    fn test_unclosed_brace_passes_through() {
        let out = resolve_in("/render/{timestamp", &job(), TimestampZone::Utc).unwrap();
        assert_eq!(out, "/render/{timestamp");
    }
}
