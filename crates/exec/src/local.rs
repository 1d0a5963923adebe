//! Local process execution and local file collection

use globset::Glob;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::task;
use triage_errors::{Error, ExecError};

/// Combined result of one executed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the process died to a signal
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr
    pub output: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run a local process and capture combined stdout/stderr.
///
/// The uid/gid overrides come from the AS preamble; the environment map
/// is the machine's execution context, layered over the inherited one.
///
/// # Errors
///
/// Returns [`ExecError::SpawnFailed`] when the program cannot be
/// started. A non-zero exit is not an error here; callers decide how to
/// record it.
pub async fn run_local(
    program: &str,
    args: &[String],
    env: &HashMap<String, String>,
    uid: Option<u32>,
    gid: Option<u32>,
) -> Result<CommandOutput, Error> {
    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(uid) = uid {
        command.uid(uid);
    }
    if let Some(gid) = gid {
        command.gid(gid);
    }

    let output = command
        .output()
        .await
        .map_err(|e| ExecError::SpawnFailed {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CommandOutput {
        exit_code: output.status.code(),
        output: combined,
    })
}

/// Collect local files under the machine's workdir.
///
/// A plain file copies to `dest_root/<relative path>`; a directory (or a
/// `*` pattern) switches to directory-mode copy, collecting every file
/// beneath it. Returns the destination paths written.
///
/// # Errors
///
/// Returns an error when the pattern is invalid, nothing matches, or a
/// file fails to copy.
pub async fn copy_local(path: &str, dest_root: &Path) -> Result<Vec<PathBuf>, Error> {
    let path = path.to_string();
    let dest_root = dest_root.to_path_buf();
    task::spawn_blocking(move || copy_local_blocking(&path, &dest_root))
        .await
        .map_err(|e| Error::internal(format!("copy task: {e}")))?
}

fn copy_local_blocking(path: &str, dest_root: &Path) -> Result<Vec<PathBuf>, Error> {
    let sources = if path.contains('*') {
        expand_pattern(path)?
    } else {
        let meta = std::fs::metadata(path)
            .map_err(|e| Error::io_with_path(&e, PathBuf::from(path)))?;
        if meta.is_dir() {
            let mut files = Vec::new();
            collect_files(Path::new(path), &mut files)?;
            files
        } else {
            vec![PathBuf::from(path)]
        }
    };

    if sources.is_empty() {
        return Err(Error::internal(format!("no files match {path}")));
    }

    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let dest = dest_root.join(relative_name(&source));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
        }
        std::fs::copy(&source, &dest).map_err(|e| Error::io_with_path(&e, &source))?;
        written.push(dest);
    }
    Ok(written)
}

/// Expand a `*` pattern into the files beneath its fixed prefix
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let matcher = Glob::new(pattern)
        .map_err(|e| Error::internal(format!("bad pattern {pattern}: {e}")))?
        .compile_matcher();

    // Walk from the deepest directory before the first wildcard component
    let pattern_path = Path::new(pattern);
    let mut base = PathBuf::new();
    for component in pattern_path.components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains('*') {
            break;
        }
        base.push(component);
    }
    if base.as_os_str().is_empty() {
        base = PathBuf::from(".");
    }

    let mut all = Vec::new();
    collect_files(&base, &mut all)?;
    Ok(all
        .into_iter()
        .filter(|candidate| {
            matcher.is_match(candidate)
                || candidate
                    .ancestors()
                    .any(|ancestor| matcher.is_match(ancestor))
        })
        .collect())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io_with_path(&e, dir))? {
        let entry = entry.map_err(|e| Error::io_with_path(&e, dir))?;
        let path = entry.path();
        if entry
            .file_type()
            .map_err(|e| Error::io_with_path(&e, &path))?
            .is_dir()
        {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Strip root/prefix components so the copy lands relative to the
/// machine workdir
pub(crate) fn relative_name(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_combined_output() {
        let out = run_local("/bin/echo", &["HELLO".to_string()], &HashMap::new(), None, None)
            .await
            .expect("run");
        assert!(out.success());
        assert_eq!(out.output.trim(), "HELLO");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let out = run_local(
            "/bin/sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            &HashMap::new(),
            None,
            None,
        )
        .await
        .expect("run");
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert!(out.output.contains("oops"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let err = run_local("/no/such/binary", &[], &HashMap::new(), None, None)
            .await
            .expect_err("spawn");
        assert!(matches!(err, Error::Exec(ExecError::SpawnFailed { .. })));
    }

    #[tokio::test]
    async fn copies_a_single_file_relative_to_dest() {
        let src_dir = tempfile::tempdir().expect("src");
        let dest_dir = tempfile::tempdir().expect("dest");
        let file = src_dir.path().join("notes.log");
        std::fs::write(&file, "contents").expect("write");

        let written = copy_local(file.to_str().expect("utf8"), dest_dir.path())
            .await
            .expect("copy");
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with(dest_dir.path()));
        assert_eq!(
            std::fs::read_to_string(&written[0]).expect("read"),
            "contents"
        );
    }

    #[tokio::test]
    async fn directory_copy_collects_nested_files() {
        let src_dir = tempfile::tempdir().expect("src");
        let dest_dir = tempfile::tempdir().expect("dest");
        std::fs::create_dir_all(src_dir.path().join("nested")).expect("mkdir");
        std::fs::write(src_dir.path().join("a.log"), "a").expect("write");
        std::fs::write(src_dir.path().join("nested/b.log"), "b").expect("write");

        let written = copy_local(src_dir.path().to_str().expect("utf8"), dest_dir.path())
            .await
            .expect("copy");
        assert_eq!(written.len(), 2);
    }

    #[tokio::test]
    async fn glob_pattern_selects_matching_files() {
        let src_dir = tempfile::tempdir().expect("src");
        let dest_dir = tempfile::tempdir().expect("dest");
        std::fs::write(src_dir.path().join("keep.log"), "k").expect("write");
        std::fs::write(src_dir.path().join("skip.txt"), "s").expect("write");

        let pattern = format!("{}/*.log", src_dir.path().display());
        let written = copy_local(&pattern, dest_dir.path()).await.expect("copy");
        assert_eq!(written.len(), 1);
        assert!(written[0].to_string_lossy().ends_with("keep.log"));
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let dest_dir = tempfile::tempdir().expect("dest");
        assert!(copy_local("/no/such/path", dest_dir.path()).await.is_err());
    }
}
