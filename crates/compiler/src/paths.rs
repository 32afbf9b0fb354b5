//! POSIX-style path helpers for worker-side paths.
//!
//! Output paths are interpreted on the workers, not on the machine running
//! the compiler, so these operate on `/`-separated strings rather than
//! `std::path`.

/// Join two path segments with exactly one `/` between them.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Everything before the last path component; `.` when there is none.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].trim_end_matches('/').to_string(),
        None => ".".to_string(),
    }
}

/// The last path component.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// The last path component without its final extension.
pub fn stem(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("/render/out", "frame_"), "/render/out/frame_");
        assert_eq!(join("/render/out/", "/frame_"), "/render/out/frame_");
        assert_eq!(join("", "frame_"), "frame_");
        assert_eq!(join("/", "render"), "/render");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/jobs/shot/render/######"), "/jobs/shot/render");
        assert_eq!(dirname("/jobs/shot/render/"), "/jobs/shot");
        assert_eq!(dirname("/shot.blend"), "/");
        assert_eq!(dirname("shot.blend"), ".");
        assert_eq!(dirname("/"), "/");
    }

    #[test]
    fn test_backslash_is_not_a_separator() {
        // Worker paths are POSIX whatever host runs the compiler.
        assert_eq!(basename("/jobs/a\\b.blend"), "a\\b.blend");
        assert_eq!(dirname("/jobs/a\\b.blend"), "/jobs");
        assert_eq!(join("/render", "frame_"), "/render/frame_");
    }

    #[test]
    fn test_basename_and_stem() {
        assert_eq!(basename("/jobs/shot/render/######"), "######");
        assert_eq!(stem("/jobs/shot.flamenco.blend"), "shot.flamenco");
        assert_eq!(stem("/jobs/.hidden"), ".hidden");
        assert_eq!(stem("noext"), "noext");
    }
}
