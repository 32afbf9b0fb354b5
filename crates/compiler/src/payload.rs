//! Engine configuration scripts and how they reach the worker.
//!
//! A payload is opaque source text plus a strategy. The strategy decides
//! whether the source rides along inside the render command's arguments
//! or is written to the render directory by a setup command first.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use farmjob_common::error::{FarmjobError, FarmjobResult};
use farmjob_job_model::Command;

use crate::paths;

/// Engine flag that runs a Python expression.
pub const PYTHON_EXPR_FLAG: &str = "--python-expr";

/// Engine flag that runs a Python file.
pub const PYTHON_FILE_FLAG: &str = "--python";

const INLINE_PREFIX: &str = "exec(__import__(\"base64\").b64decode(\"";
const INLINE_SUFFIX: &str = "\").decode())";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingStrategy {
    /// Source passed verbatim as a `--python-expr` argument.
    InlinePlain,
    /// Source base64-encoded inside a self-decoding `--python-expr`.
    InlineBase64,
    /// Source written to `<render dir>/<file_name>` and run with `--python`.
    File { file_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationPayload {
    pub name: String,
    source: String,
    pub strategy: EmbeddingStrategy,
}

/// What a payload contributes to a render task.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedPayload {
    /// Command that must run before the render, if any.
    pub setup: Option<Command>,
    /// Arguments appended to the render command.
    pub args: Vec<String>,
}

impl ConfigurationPayload {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        strategy: EmbeddingStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            strategy,
        }
    }

    pub fn inline_plain(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, source, EmbeddingStrategy::InlinePlain)
    }

    pub fn inline_base64(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, source, EmbeddingStrategy::InlineBase64)
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            source,
            EmbeddingStrategy::File {
                file_name: file_name.into(),
            },
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Produce the setup command and render arguments for this payload.
    pub fn embed(&self, render_dir: &str) -> FarmjobResult<EmbeddedPayload> {
        match &self.strategy {
            EmbeddingStrategy::InlinePlain => Ok(EmbeddedPayload {
                setup: None,
                args: vec![PYTHON_EXPR_FLAG.to_string(), self.source.clone()],
            }),
            EmbeddingStrategy::InlineBase64 => Ok(EmbeddedPayload {
                setup: None,
                args: vec![
                    PYTHON_EXPR_FLAG.to_string(),
                    encode_inline_expression(self.source.as_bytes()),
                ],
            }),
            EmbeddingStrategy::File { file_name } => {
                if file_name.is_empty() || file_name.contains('/') {
                    return Err(FarmjobError::config(format!(
                        "payload {:?} has invalid file name {file_name:?}",
                        self.name
                    )));
                }
                if self.source.contains('\0') {
                    return Err(FarmjobError::config(format!(
                        "payload {:?} contains a NUL byte and cannot be passed to sh",
                        self.name
                    )));
                }
                let path = paths::join(render_dir, file_name);
                let script = file_write_script(&path, &self.source);
                Ok(EmbeddedPayload {
                    setup: Some(Command::exec("sh", ["-c".to_string(), script])),
                    args: vec![PYTHON_FILE_FLAG.to_string(), path],
                })
            }
        }
    }
}

/// Wrap `source` in a self-decoding Python expression.
pub fn encode_inline_expression(source: &[u8]) -> String {
    format!("{INLINE_PREFIX}{}{INLINE_SUFFIX}", BASE64.encode(source))
}

/// Recover the source bytes from an expression built by
/// [`encode_inline_expression`].
pub fn decode_inline_expression(expr: &str) -> FarmjobResult<Vec<u8>> {
    let encoded = expr
        .strip_prefix(INLINE_PREFIX)
        .and_then(|rest| rest.strip_suffix(INLINE_SUFFIX))
        .ok_or_else(|| FarmjobError::input("not an inline base64 payload expression"))?;
    BASE64
        .decode(encoded)
        .map_err(|e| FarmjobError::input(format!("invalid base64 in payload: {e}")))
}

/// Shell script that writes `source` to `path` byte for byte.
pub fn file_write_script(path: &str, source: &str) -> String {
    format!(
        "printf '%s' {} > {}",
        shell_words::quote(source),
        shell_words::quote(path)
    )
}

/// Recover `(path, source)` from a script built by [`file_write_script`].
pub fn decode_file_write(script: &str) -> FarmjobResult<(String, String)> {
    let words = shell_words::split(script)
        .map_err(|e| FarmjobError::input(format!("unparsable file-write script: {e}")))?;

    match <[String; 5]>::try_from(words) {
        Ok([printf, format, source, redirect, path])
            if printf == "printf" && format == "%s" && redirect == ">" =>
        {
            Ok((path, source))
        }
        _ => Err(FarmjobError::input("not a payload file-write script")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_plain_is_verbatim() {
        let payload = ConfigurationPayload::inline_plain("device", "import bpy; print(1)");
        let embedded = payload.embed("/render").unwrap();
        assert!(embedded.setup.is_none());
        assert_eq!(embedded.args, ["--python-expr", "import bpy; print(1)"]);
    }

    #[test]
    fn test_inline_base64_shape() {
        let payload = ConfigurationPayload::inline_base64("setup", "print('hi')\n");
        let embedded = payload.embed("/render").unwrap();
        assert_eq!(embedded.args[0], "--python-expr");
        assert_eq!(
            embedded.args[1],
            "exec(__import__(\"base64\").b64decode(\"cHJpbnQoJ2hpJykK\").decode())"
        );
        assert_eq!(
            decode_inline_expression(&embedded.args[1]).unwrap(),
            b"print('hi')\n"
        );
    }

    #[test]
    fn test_file_strategy_writes_into_render_dir() {
        let source = "import bpy\nprint(\"it's $HOME\")\n";
        let payload = ConfigurationPayload::file("eevee", "eevee_config.py", source);
        let embedded = payload.embed("/render/shot dir").unwrap();

        assert_eq!(
            embedded.args,
            ["--python", "/render/shot dir/eevee_config.py"]
        );
        let setup = embedded.setup.unwrap();
        let exec = setup.as_exec().unwrap();
        assert_eq!(exec.exe, "sh");
        assert_eq!(exec.args[0], "-c");

        let (path, recovered) = decode_file_write(&exec.args[1]).unwrap();
        assert_eq!(path, "/render/shot dir/eevee_config.py");
        assert_eq!(recovered, source);
    }

    #[test]
    fn test_file_name_must_be_plain() {
        let payload = ConfigurationPayload::file("bad", "../escape.py", "x");
        assert!(payload.embed("/render").unwrap_err().is_config());
    }

    #[test]
    fn test_file_source_with_nul_is_rejected() {
        let payload = ConfigurationPayload::file("cfg", "cfg.py", "a = 1\0\nb = 2\n");
        let err = payload.embed("/render").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("NUL"));

        // Inline strategies carry the bytes encoded, so NUL is fine there.
        let inline = ConfigurationPayload::inline_base64("cfg", "a = 1\0");
        let embedded = inline.embed("/render").unwrap();
        assert_eq!(decode_inline_expression(&embedded.args[1]).unwrap(), b"a = 1\0");
    }

    #[test]
    fn test_decode_rejects_foreign_input() {
        assert!(decode_inline_expression("print(1)").is_err());
        assert!(decode_file_write("rm -rf /").is_err());
        assert!(decode_file_write("printf '%s' 'x' >").is_err());
    }
}
