//! Process-backed sandbox provider.
//!
//! Each sandbox is a directory under a root path; commands run through `sh -c`
//! with the sandbox directory as working directory. Because state lives on
//! disk, a sandbox id can be resumed by a fresh provider instance.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{CommandOutput, CommandSpec, OutputChunk, SandboxError, SandboxProvider, SandboxSpec};

struct LocalSandbox {
    dir: PathBuf,
    paused: bool,
    envs: HashMap<String, String>,
}

/// Sandbox provider that isolates work in per-sandbox directories on the host.
pub struct LocalSandboxProvider {
    root: PathBuf,
    sandboxes: RwLock<HashMap<String, LocalSandbox>>,
}

impl LocalSandboxProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sandboxes: RwLock::new(HashMap::new()),
        }
    }

    /// Directory backing a sandbox id.
    pub fn sandbox_dir(&self, sandbox_id: &str) -> PathBuf {
        self.root.join(sandbox_id)
    }
}

impl Default for LocalSandboxProvider {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("vibekit-sandboxes"))
    }
}

#[async_trait]
impl SandboxProvider for LocalSandboxProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<String, SandboxError> {
        let id = format!("local-{}", Uuid::new_v4().simple());
        let dir = self.sandbox_dir(&id);
        tokio::fs::create_dir_all(&dir).await?;

        self.sandboxes.write().await.insert(
            id.clone(),
            LocalSandbox {
                dir,
                paused: false,
                envs: spec.envs.clone(),
            },
        );
        debug!(sandbox_id = %id, "Created local sandbox");
        Ok(id)
    }

    async fn resume(&self, sandbox_id: &str) -> Result<(), SandboxError> {
        let mut sandboxes = self.sandboxes.write().await;
        if let Some(sandbox) = sandboxes.get_mut(sandbox_id) {
            sandbox.paused = false;
            return Ok(());
        }

        // Sandboxes created by an earlier process are still on disk
        let dir = self.sandbox_dir(sandbox_id);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(SandboxError::NotFound(sandbox_id.to_string()));
        }
        sandboxes.insert(
            sandbox_id.to_string(),
            LocalSandbox {
                dir,
                paused: false,
                envs: HashMap::new(),
            },
        );
        debug!(sandbox_id = %sandbox_id, "Reattached local sandbox from disk");
        Ok(())
    }

    async fn pause(&self, sandbox_id: &str) -> Result<(), SandboxError> {
        let mut sandboxes = self.sandboxes.write().await;
        let sandbox = sandboxes
            .get_mut(sandbox_id)
            .ok_or_else(|| SandboxError::NotFound(sandbox_id.to_string()))?;
        sandbox.paused = true;
        Ok(())
    }

    async fn kill(&self, sandbox_id: &str) -> Result<(), SandboxError> {
        let removed = self.sandboxes.write().await.remove(sandbox_id);
        let dir = match removed {
            Some(sandbox) => sandbox.dir,
            None => self.sandbox_dir(sandbox_id),
        };
        if !tokio::fs::try_exists(&dir).await? {
            return Err(SandboxError::NotFound(sandbox_id.to_string()));
        }
        tokio::fs::remove_dir_all(&dir).await?;
        debug!(sandbox_id = %sandbox_id, "Killed local sandbox");
        Ok(())
    }

    async fn run(
        &self,
        sandbox_id: &str,
        command: CommandSpec,
        output: Option<mpsc::Sender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError> {
        let (dir, envs) = {
            let sandboxes = self.sandboxes.read().await;
            let sandbox = sandboxes
                .get(sandbox_id)
                .ok_or_else(|| SandboxError::NotFound(sandbox_id.to_string()))?;
            if sandbox.paused {
                return Err(SandboxError::Paused(sandbox_id.to_string()));
            }
            (sandbox.dir.clone(), sandbox.envs.clone())
        };

        let cwd = match &command.cwd {
            Some(rel) => dir.join(rel),
            None => dir,
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command.command)
            .current_dir(&cwd)
            .envs(envs)
            .envs(&command.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Command(format!("{}: {}", command.command, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Command("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::Command("stderr not captured".to_string()))?;

        let mut out_reader = BufReader::new(stdout);
        let mut err_reader = BufReader::new(stderr);
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let mut result = CommandOutput::default();
        let (mut out_done, mut err_done) = (false, false);

        // Buffers outlive each select! round, so a cancelled read_until resumes
        // with its partial line intact.
        while !(out_done && err_done) {
            let chunk = tokio::select! {
                n = out_reader.read_until(b'\n', &mut out_buf), if !out_done => {
                    if n? == 0 {
                        out_done = true;
                        None
                    } else {
                        let line = take_line(&mut out_buf);
                        result.stdout.push_str(&line);
                        result.stdout.push('\n');
                        Some(OutputChunk::Stdout(line))
                    }
                },
                n = err_reader.read_until(b'\n', &mut err_buf), if !err_done => {
                    if n? == 0 {
                        err_done = true;
                        None
                    } else {
                        let line = take_line(&mut err_buf);
                        result.stderr.push_str(&line);
                        result.stderr.push('\n');
                        Some(OutputChunk::Stderr(line))
                    }
                },
            };

            if let (Some(chunk), Some(tx)) = (chunk, output.as_ref()) {
                if tx.send(chunk).await.is_err() {
                    debug!("Output receiver dropped");
                }
            }
        }

        let status = child.wait().await?;
        result.exit_code = status.code().unwrap_or(-1);
        Ok(result)
    }
}

/// Drain one line from `buf`, dropping the line ending. Invalid UTF-8 is
/// replaced rather than failing the command.
fn take_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_collects_output() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let id = provider.create(&SandboxSpec::default()).await.unwrap();

        let out = provider
            .run(&id, CommandSpec::new("echo hello; echo oops 1>&2; exit 3"), None)
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    async fn test_run_tolerates_invalid_utf8() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let id = provider.create(&SandboxSpec::default()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let out = provider
            .run(
                &id,
                CommandSpec::new("echo before; printf '\\377\\376\\n'; echo after; exit 0"),
                Some(tx),
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "before\n\u{FFFD}\u{FFFD}\nafter\n");

        let mut lines = vec![];
        while let Some(chunk) = rx.recv().await {
            lines.push(chunk);
        }
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], OutputChunk::Stdout("after".into()));
    }

    #[test]
    fn test_take_line_strips_line_endings() {
        let mut buf = b"crlf\r\n".to_vec();
        assert_eq!(take_line(&mut buf), "crlf");
        assert!(buf.is_empty());

        let mut buf = b"no newline".to_vec();
        assert_eq!(take_line(&mut buf), "no newline");
    }

    #[tokio::test]
    async fn test_run_streams_lines_in_order() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let id = provider.create(&SandboxSpec::default()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let out = provider
            .run(&id, CommandSpec::new("printf 'a\\nb\\nc\\n'"), Some(tx))
            .await
            .unwrap();
        assert!(out.success());

        let mut lines = vec![];
        while let Some(chunk) = rx.recv().await {
            lines.push(chunk);
        }
        assert_eq!(
            lines,
            vec![
                OutputChunk::Stdout("a".into()),
                OutputChunk::Stdout("b".into()),
                OutputChunk::Stdout("c".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_envs_and_cwd() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let mut spec = SandboxSpec::default();
        spec.envs.insert("GREETING".into(), "hi".into());
        let id = provider.create(&spec).await.unwrap();

        provider
            .run(&id, CommandSpec::new("mkdir sub"), None)
            .await
            .unwrap();
        let out = provider
            .run(&id, CommandSpec::new("echo $GREETING; pwd").in_dir("sub"), None)
            .await
            .unwrap();
        let mut lines = out.stdout.lines();
        assert_eq!(lines.next(), Some("hi"));
        assert!(lines.next().unwrap().ends_with("/sub"));
    }

    #[tokio::test]
    async fn test_pause_blocks_commands_until_resume() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let id = provider.create(&SandboxSpec::default()).await.unwrap();

        provider.pause(&id).await.unwrap();
        let err = provider
            .run(&id, CommandSpec::new("true"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Paused(_)));

        provider.resume(&id).await.unwrap();
        assert!(provider
            .run(&id, CommandSpec::new("true"), None)
            .await
            .unwrap()
            .success());
    }

    #[tokio::test]
    async fn test_resume_from_disk_in_new_provider() {
        let root = TempDir::new().unwrap();
        let id = {
            let provider = LocalSandboxProvider::new(root.path());
            let id = provider.create(&SandboxSpec::default()).await.unwrap();
            provider
                .run(&id, CommandSpec::new("echo kept > state.txt"), None)
                .await
                .unwrap();
            id
        };

        let provider = LocalSandboxProvider::new(root.path());
        provider.resume(&id).await.unwrap();
        let out = provider
            .run(&id, CommandSpec::new("cat state.txt"), None)
            .await
            .unwrap();
        assert_eq!(out.stdout, "kept\n");
    }

    #[tokio::test]
    async fn test_kill_removes_sandbox() {
        let root = TempDir::new().unwrap();
        let provider = LocalSandboxProvider::new(root.path());
        let id = provider.create(&SandboxSpec::default()).await.unwrap();

        provider.kill(&id).await.unwrap();
        assert!(!provider.sandbox_dir(&id).exists());
        assert!(matches!(
            provider.resume(&id).await,
            Err(SandboxError::NotFound(_))
        ));
        assert!(matches!(
            provider.kill(&id).await,
            Err(SandboxError::NotFound(_))
        ));
    }
}
