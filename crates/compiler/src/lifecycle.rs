//! Settings passes that run around compilation.

use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::{SettingDef, SettingKind, SettingValue, Settings};

/// Fill keys missing from `settings` with their schema defaults.
///
/// Returns the number of defaults applied.
pub fn apply_defaults(settings: &mut Settings, schema: &[SettingDef]) -> usize {
    let mut applied = 0;
    for def in schema {
        if let Some(default) = &def.default {
            if !settings.contains_key(&def.key) {
                settings.insert(def.key.clone(), default.clone());
                applied += 1;
            }
        }
    }
    applied
}

/// Fail on the first required setting that is missing or empty.
pub fn validate_required(settings: &Settings, schema: &[SettingDef]) -> FarmjobResult<()> {
    for def in schema.iter().filter(|d| d.required) {
        match settings.get(&def.key) {
            None => {
                return Err(FarmjobError::config(format!("no {} setting!", def.key)));
            }
            Some(SettingValue::String(s)) if s.is_empty() => {
                return Err(FarmjobError::config(format!("no {} setting!", def.key)));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Fail when a present setting does not match its declared type.
///
/// Integers are accepted for float settings and integral floats for
/// integer settings, since JSON does not tell them apart.
pub fn validate_types(settings: &Settings, schema: &[SettingDef]) -> FarmjobResult<()> {
    for def in schema {
        let Some(value) = settings.get(&def.key) else {
            continue;
        };
        let ok = match (def.kind, value) {
            (SettingKind::String, SettingValue::String(_)) => true,
            (SettingKind::Bool, SettingValue::Bool(_)) => true,
            (SettingKind::Float, SettingValue::Float(_) | SettingValue::Int(_)) => true,
            (SettingKind::Int32, SettingValue::Int(_)) => true,
            (SettingKind::Int32, SettingValue::Float(f)) => {
                f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX)
            }
            _ => false,
        };
        if !ok {
            return Err(FarmjobError::config(format!(
                "setting {} should be {}, got {}",
                def.key,
                def.kind,
                value.kind()
            )));
        }
    }
    Ok(())
}

/// Remove each listed key whose value is empty or falsy.
///
/// Returns the removed keys.
pub fn cleanup<S: AsRef<str>>(settings: &mut Settings, keys: &[S]) -> Vec<String> {
    let mut removed = Vec::new();
    for key in keys {
        let key = key.as_ref();
        if settings.get(key).is_some_and(SettingValue::is_falsy) {
            settings.remove(key);
            tracing::debug!(key, "Removed empty setting");
            removed.push(key.to_string());
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<SettingDef> {
        vec![
            SettingDef::string("frames").required(),
            SettingDef::int32("chunk_size").required().with_default(1),
            SettingDef::float("fps"),
            SettingDef::bool("has_previews").with_default(false),
            SettingDef::string("blender_args_after"),
        ]
    }

    #[test]
    fn test_apply_defaults_fills_only_missing() {
        let mut settings = Settings::new();
        settings.insert("chunk_size", 5);

        let applied = apply_defaults(&mut settings, &schema());
        assert_eq!(applied, 1);
        assert_eq!(settings.get("chunk_size"), Some(&SettingValue::Int(5)));
        assert_eq!(settings.get("has_previews"), Some(&SettingValue::Bool(false)));
        assert!(!settings.contains_key("fps"));
    }

    #[test]
    fn test_validate_required() {
        let mut settings = Settings::new();
        settings.insert("chunk_size", 1);
        let err = validate_required(&settings, &schema()).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no frames setting!");

        settings.insert("frames", "");
        assert!(validate_required(&settings, &schema()).is_err());

        settings.insert("frames", "1-10");
        assert!(validate_required(&settings, &schema()).is_ok());
    }

    #[test]
    fn test_validate_types() {
        let mut settings = Settings::new();
        settings.insert("fps", 24);
        settings.insert("chunk_size", 4.0);
        assert!(validate_types(&settings, &schema()).is_ok());

        settings.insert("chunk_size", 4.5);
        assert!(validate_types(&settings, &schema()).unwrap_err().is_config());

        settings.insert("chunk_size", 4);
        settings.insert("has_previews", "yes");
        let err = validate_types(&settings, &schema()).unwrap_err();
        assert!(err.to_string().contains("has_previews"));
    }

    #[test]
    fn test_cleanup_removes_only_listed_falsy_keys() {
        let mut settings = Settings::new();
        settings.insert("blender_args_after", "");
        settings.insert("blender_args_before", "--debug");
        settings.insert("frames", "");
        settings.insert("use_gpu", false);
        settings.insert("samples", 0);

        let removed = cleanup(
            &mut settings,
            &["blender_args_after", "blender_args_before", "use_gpu", "samples", "absent"],
        );
        assert_eq!(removed, ["blender_args_after", "use_gpu", "samples"]);
        assert!(settings.contains_key("blender_args_before"));
        assert!(settings.contains_key("frames"));

        let again = cleanup(&mut settings, &["blender_args_after", "blender_args_before"]);
        assert!(again.is_empty());
        assert_eq!(settings.len(), 2);
    }
}
