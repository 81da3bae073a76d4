// crates/cmdstash-core/src/vcs.rs - Version control collaborator
//
// The sync engine never touches repository internals. It drives a
// `VersionControl` capability rooted at the store's directory, and `GitCli`
// provides that capability by running the `git` binary.
//
// DESIGN PRINCIPLES:
// - Every git invocation is non-interactive: stdin is closed and terminal
//   prompts are disabled, so a missing credential fails instead of hanging
// - Network operations (clone, fetch, push) are bounded by a timeout; the
//   child is killed when it expires
// - Only transient transport failures are retried, a bounded number of times;
//   authentication failures and timeouts surface immediately

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::Error;

/// Failures reported by the version control collaborator
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("could not run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("git {command} timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("git {command} was refused by the remote: {stderr}")]
    Auth { command: String, stderr: String },

    #[error("git {command} could not reach the remote: {stderr}")]
    Transport { command: String, stderr: String },

    #[error("could not prepare the repository directory: {0}")]
    Io(#[source] std::io::Error),
}

/// Result type for version control operations
pub type VcsResult<T> = Result<T, VcsError>;

impl VcsError {
    fn summary(&self) -> String {
        match self {
            Self::Spawn(_) => "git is not available".to_string(),
            Self::Failed { command, .. } => format!("git {command} failed"),
            Self::TimedOut { .. } => "the remote did not respond in time".to_string(),
            Self::Auth { .. } => "the remote rejected the credentials".to_string(),
            Self::Transport { .. } => "the remote is unreachable".to_string(),
            Self::Io(_) => "could not prepare the repository directory".to_string(),
        }
    }
}

impl From<VcsError> for Error {
    fn from(err: VcsError) -> Self {
        Error::sync_with(err.summary(), err)
    }
}

/// How `reset_to` treats the index and working tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Move the branch only; index and working tree keep their content
    Soft,
    /// Move the branch and overwrite index and working tree
    Hard,
}

/// Local repository state relative to a remote-tracking ref
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepoStatus {
    /// The tracked file has uncommitted changes (or is untracked)
    pub dirty: bool,
    /// Commits on HEAD that the upstream does not have
    pub ahead: usize,
    /// Commits on the upstream that HEAD does not have
    pub behind: usize,
    /// Whether the upstream ref exists at all (false for an empty remote)
    pub upstream_exists: bool,
}

/// Repository operations the sync engine relies on
///
/// Implementations are bound to one working directory.
pub trait VersionControl {
    /// Whether the working directory is the top of a repository
    fn is_repository(&self) -> bool;

    /// Create a new repository whose first commit lands on `branch`
    fn init(&self, branch: &str) -> VcsResult<()>;

    /// Clone `url` into the working directory, checking out `branch` if the
    /// remote has it
    fn clone_from(&self, url: &str, remote: &str, branch: &str) -> VcsResult<()>;

    /// Point `remote` at `url`, adding it when absent
    fn set_remote(&self, remote: &str, url: &str) -> VcsResult<()>;

    /// Update remote-tracking refs without touching the working tree
    fn fetch(&self, remote: &str) -> VcsResult<()>;

    /// State of `path` and of HEAD relative to `upstream`
    fn status(&self, path: &Path, upstream: &str) -> VcsResult<RepoStatus>;

    /// Stage `path` and commit it; returns false when there was nothing to commit
    fn stage_and_commit(&self, path: &Path, message: &str) -> VcsResult<bool>;

    /// Fast-forward HEAD to `upstream`; fails if that is not possible
    fn fast_forward(&self, upstream: &str) -> VcsResult<()>;

    /// Merge `upstream` into HEAD; returns false when the merge stopped on conflicts
    fn merge(&self, upstream: &str) -> VcsResult<bool>;

    /// Record `upstream` as merged while keeping HEAD's tree unchanged
    fn merge_keeping_ours(&self, upstream: &str) -> VcsResult<()>;

    fn abort_merge(&self) -> VcsResult<()>;

    /// Best common ancestor of two revisions, if they share history
    fn merge_base(&self, a: &str, b: &str) -> VcsResult<Option<String>>;

    /// Content of `path` at `rev`, `None` when the file does not exist there
    fn show(&self, rev: &str, path: &Path) -> VcsResult<Option<String>>;

    /// Paths with unresolved conflicts
    fn conflicted_paths(&self) -> VcsResult<Vec<PathBuf>>;

    fn reset_to(&self, rev: &str, mode: ResetMode) -> VcsResult<()>;

    /// Commit id of HEAD, `None` before the first commit
    fn head(&self) -> VcsResult<Option<String>>;

    /// Push HEAD to `branch` on `remote`
    fn push(&self, remote: &str, branch: &str) -> VcsResult<()>;
}

struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// `VersionControl` backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
    timeout: Duration,
    retries: u32,
    identity: Option<(String, String)>,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timeout: Duration::from_secs(30),
            retries: 2,
            identity: None,
        }
    }

    /// Upper bound for each network operation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra attempts for transient transport failures
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Commit identity passed as `-c user.name/user.email`
    pub fn with_identity(mut self, identity: Option<(String, String)>) -> Self {
        self.identity = identity;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a `git` executable can be run at all
    pub fn available() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn command(&self, cwd: &Path, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        if let Some((name, email)) = &self.identity {
            command
                .arg("-c")
                .arg(format!("user.name={name}"))
                .arg("-c")
                .arg(format!("user.email={email}"));
        }
        command
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Run a local command and return its output whatever the exit status
    fn run_unchecked(&self, args: &[&str]) -> VcsResult<GitOutput> {
        debug!(dir = %self.dir.display(), ?args, "git");
        let output = self
            .command(&self.dir, args)
            .output()
            .map_err(VcsError::Spawn)?;
        Ok(GitOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run a local command that must succeed
    fn run(&self, args: &[&str]) -> VcsResult<String> {
        let output = self.run_unchecked(args)?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(VcsError::Failed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Run a network command with timeout and bounded transient retries
    #[instrument(level = "debug", skip(self, cwd), fields(dir = %cwd.display()))]
    fn run_network(&self, cwd: &Path, args: &[&str]) -> VcsResult<()> {
        let name = args.first().copied().unwrap_or_default().to_string();
        let mut attempt = 0;

        loop {
            let command = self.command(cwd, args);
            let result = match run_with_timeout(command, self.timeout).map_err(VcsError::Spawn)? {
                None => Err(VcsError::TimedOut {
                    command: name.clone(),
                    timeout: self.timeout,
                }),
                Some(output) if output.status.success() => Ok(()),
                Some(output) => Err(classify_failure(&name, output.stderr.trim())),
            };

            match result {
                Err(VcsError::Transport { .. }) if attempt < self.retries => {
                    attempt += 1;
                    warn!(command = %name, attempt, "transient network failure, retrying");
                    thread::sleep(Duration::from_millis(250 * u64::from(attempt)));
                }
                other => return other,
            }
        }
    }

    fn resolve(&self, rev: &str) -> VcsResult<Option<String>> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.run_unchecked(&["rev-parse", "--verify", "--quiet", &spec])?;
        if output.status.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    fn count(&self, range: &str) -> VcsResult<usize> {
        let out = self.run(&["rev-list", "--count", range])?;
        Ok(out.trim().parse().unwrap_or(0))
    }
}

impl VersionControl for GitCli {
    fn is_repository(&self) -> bool {
        if !self.dir.is_dir() {
            return false;
        }
        match self.run_unchecked(&["rev-parse", "--show-toplevel"]) {
            Ok(output) if output.status.success() => {
                let top = PathBuf::from(output.stdout.trim());
                match (top.canonicalize(), self.dir.canonicalize()) {
                    (Ok(top), Ok(dir)) => top == dir,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn init(&self, branch: &str) -> VcsResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(VcsError::Io)?;
        self.run(&["init", "--quiet"])?;
        let head = format!("refs/heads/{branch}");
        self.run(&["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    fn clone_from(&self, url: &str, remote: &str, branch: &str) -> VcsResult<()> {
        let parent = match self.dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(VcsError::Io)?;

        let target = match self.dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return Err(VcsError::Failed {
                    command: "clone".to_string(),
                    stderr: format!("cannot clone into {}", self.dir.display()),
                });
            }
        };
        self.run_network(&parent, &["clone", "--quiet", "--origin", remote, url, &target])?;

        let upstream = format!("{remote}/{branch}");
        if self.resolve(&upstream)?.is_some() {
            self.run(&["checkout", "--quiet", "-B", branch, &upstream])?;
        } else {
            // empty remote: make the first commit land on the configured branch
            let head = format!("refs/heads/{branch}");
            self.run(&["symbolic-ref", "HEAD", &head])?;
        }
        Ok(())
    }

    fn set_remote(&self, remote: &str, url: &str) -> VcsResult<()> {
        let existing = self.run_unchecked(&["remote", "get-url", remote])?;
        if existing.status.success() {
            if existing.stdout.trim() != url {
                self.run(&["remote", "set-url", remote, url])?;
            }
        } else {
            self.run(&["remote", "add", remote, url])?;
        }
        Ok(())
    }

    fn fetch(&self, remote: &str) -> VcsResult<()> {
        self.run_network(&self.dir, &["fetch", "--quiet", "--prune", remote])
    }

    fn status(&self, path: &Path, upstream: &str) -> VcsResult<RepoStatus> {
        let path = path.to_string_lossy();
        let porcelain = self.run(&["status", "--porcelain", "--", &path])?;
        let dirty = !porcelain.trim().is_empty();

        let head = self.resolve("HEAD")?;
        let remote = self.resolve(upstream)?;

        let (ahead, behind) = match (&head, &remote) {
            (None, None) => (0, 0),
            (None, Some(_)) => (0, self.count(upstream)?),
            (Some(_), None) => (self.count("HEAD")?, 0),
            (Some(_), Some(_)) => {
                let range = format!("HEAD...{upstream}");
                let out = self.run(&["rev-list", "--left-right", "--count", &range])?;
                let mut counts = out.split_whitespace().map(|n| n.parse().unwrap_or(0));
                (counts.next().unwrap_or(0), counts.next().unwrap_or(0))
            }
        };

        Ok(RepoStatus {
            dirty,
            ahead,
            behind,
            upstream_exists: remote.is_some(),
        })
    }

    fn stage_and_commit(&self, path: &Path, message: &str) -> VcsResult<bool> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &path])?;

        // exit status 1 means the index differs from HEAD
        let staged = self.run_unchecked(&["diff", "--cached", "--quiet", "--", &path])?;
        if staged.status.success() {
            return Ok(false);
        }

        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(true)
    }

    fn fast_forward(&self, upstream: &str) -> VcsResult<()> {
        self.run(&["merge", "--quiet", "--ff-only", upstream])?;
        Ok(())
    }

    fn merge(&self, upstream: &str) -> VcsResult<bool> {
        let output = self.run_unchecked(&[
            "merge",
            "--quiet",
            "--no-edit",
            "--allow-unrelated-histories",
            upstream,
        ])?;
        if output.status.success() {
            return Ok(true);
        }
        if !self.conflicted_paths()?.is_empty() {
            return Ok(false);
        }
        Err(VcsError::Failed {
            command: "merge".to_string(),
            stderr: format!("{}{}", output.stdout.trim(), output.stderr.trim()),
        })
    }

    fn merge_keeping_ours(&self, upstream: &str) -> VcsResult<()> {
        self.run(&[
            "merge",
            "--quiet",
            "--no-edit",
            "--allow-unrelated-histories",
            "--strategy=ours",
            upstream,
        ])?;
        Ok(())
    }

    fn abort_merge(&self) -> VcsResult<()> {
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    fn merge_base(&self, a: &str, b: &str) -> VcsResult<Option<String>> {
        let output = self.run_unchecked(&["merge-base", a, b])?;
        if output.status.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    fn show(&self, rev: &str, path: &Path) -> VcsResult<Option<String>> {
        let object = format!("{rev}:{}", path.to_string_lossy());
        let output = self.run_unchecked(&["show", &object])?;
        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }

    fn conflicted_paths(&self) -> VcsResult<Vec<PathBuf>> {
        let out = self.run(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn reset_to(&self, rev: &str, mode: ResetMode) -> VcsResult<()> {
        let flag = match mode {
            ResetMode::Soft => "--soft",
            ResetMode::Hard => "--hard",
        };
        self.run(&["reset", "--quiet", flag, rev])?;
        Ok(())
    }

    fn head(&self) -> VcsResult<Option<String>> {
        self.resolve("HEAD")
    }

    fn push(&self, remote: &str, branch: &str) -> VcsResult<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.run_network(&self.dir, &["push", "--quiet", "--set-upstream", remote, &refspec])
    }
}

/// Spawn `command` and wait at most `timeout` for it
///
/// Returns `None` when the deadline passed; the child has been killed by then.
fn run_with_timeout(mut command: Command, timeout: Duration) -> std::io::Result<Option<GitOutput>> {
    let mut child = command.spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = thread::spawn(move || drain(stdout));
    let err_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // readers are left detached: a grandchild (ssh) may still hold the pipes
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(20));
    };

    Ok(Some(GitOutput {
        status,
        stdout: out_reader.join().unwrap_or_default(),
        stderr: err_reader.join().unwrap_or_default(),
    }))
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

const AUTH_MARKERS: &[&str] = &[
    "authentication failed",
    "permission denied",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "access denied",
    "403",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "could not resolve host",
    "connection reset",
    "connection refused",
    "connection timed out",
    "operation timed out",
    "early eof",
    "the remote end hung up unexpectedly",
    "temporary failure",
];

/// Sort a failed network command into auth, transport or plain failure
fn classify_failure(command: &str, stderr: &str) -> VcsError {
    let lower = stderr.to_lowercase();
    let command = command.to_string();
    let stderr = stderr.to_string();

    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        VcsError::Auth { command, stderr }
    } else if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        VcsError::Transport { command, stderr }
    } else {
        VcsError::Failed { command, stderr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> Option<(TempDir, GitCli)> {
        if !GitCli::available() {
            return None;
        }
        let temp = TempDir::new().unwrap();
        let git = GitCli::new(temp.path().join("repo")).with_identity(Some((
            "Test".to_string(),
            "test@example.com".to_string(),
        )));
        git.init("main").unwrap();
        Some((temp, git))
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("push", "fatal: Authentication failed for 'https://x'"),
            VcsError::Auth { .. }
        ));
        assert!(matches!(
            classify_failure("fetch", "ssh: Could not resolve host: example.invalid"),
            VcsError::Transport { .. }
        ));
        assert!(matches!(
            classify_failure("push", "! [rejected] main -> main (fetch first)"),
            VcsError::Failed { .. }
        ));
        // auth wins when both appear
        assert!(matches!(
            classify_failure("fetch", "Permission denied (publickey).\nfatal: early EOF"),
            VcsError::Auth { .. }
        ));
    }

    #[test]
    fn test_vcs_error_becomes_sync_error() {
        let err: Error = VcsError::TimedOut {
            command: "fetch".to_string(),
            timeout: Duration::from_secs(3),
        }
        .into();
        assert_eq!(err.kind(), "sync");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "git fetch timed out after 3s");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_child() {
        let mut command = Command::new("sleep");
        command.arg("5").stdout(Stdio::piped()).stderr(Stdio::piped());

        let started = Instant::now();
        let output = run_with_timeout(command, Duration::from_millis(100)).unwrap();
        assert!(output.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_collects_output() {
        let mut command = Command::new("echo");
        command.arg("hello").stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = run_with_timeout(command, Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_init_and_commit() {
        let Some((_temp, git)) = repo() else {
            return;
        };
        assert!(git.is_repository());
        assert_eq!(git.head().unwrap(), None);

        let file = Path::new("snippets.toml");
        std::fs::write(git.dir().join(file), "[snippets]\n").unwrap();

        let status = git.status(file, "origin/main").unwrap();
        assert!(status.dirty);
        assert!(!status.upstream_exists);

        assert!(git.stage_and_commit(file, "first").unwrap());
        assert!(git.head().unwrap().is_some());
        assert!(!git.stage_and_commit(file, "nothing").unwrap());

        let status = git.status(file, "origin/main").unwrap();
        assert!(!status.dirty);
        assert_eq!(status.ahead, 1);
    }

    #[test]
    fn test_set_remote_is_idempotent() {
        let Some((_temp, git)) = repo() else {
            return;
        };
        git.set_remote("origin", "/tmp/a.git").unwrap();
        git.set_remote("origin", "/tmp/a.git").unwrap();
        git.set_remote("origin", "/tmp/b.git").unwrap();
        let url = git.run(&["remote", "get-url", "origin"]).unwrap();
        assert_eq!(url.trim(), "/tmp/b.git");
    }

    #[test]
    fn test_subdirectory_is_not_repository() {
        let Some((_temp, git)) = repo() else {
            return;
        };
        let nested = git.dir().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(!GitCli::new(nested).is_repository());
    }
}
