// crates/cmdstash-core/src/sync.rs - Sync Engine
//
// Reconciles the local store file with a remote copy through a version
// control repository rooted at the store's directory.
//
// Per invocation: fetch (CHECK_REMOTE), classify, then
//   UpToDate    -> nothing
//   FastForward -> fast-forward to the remote, caller reloads
//   LocalAhead  -> commit uncommitted edits, push
//   Diverged    -> commit, merge, push (all undone if the push fails)
//
// A diverged merge first lets git merge the text. When git reports a conflict
// in the store file, the three versions (merge base, ours, theirs) are merged
// snippet by snippet instead; only a snippet edited differently on both sides
// is a real conflict. On any conflict or failure the local file is restored
// to exactly what it was before the sync started.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{self, Collection};
use crate::vcs::{GitCli, RepoStatus, ResetMode, VcsError, VersionControl};

const COMMIT_MESSAGE: &str = "Update snippets";
const MERGE_MESSAGE: &str = "Merge snippets from remote";
const INIT_MESSAGE: &str = "Add snippet store";

/// Runtime options for a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub remote: String,
    pub branch: String,
    /// Upper bound for each network call
    pub timeout: Duration,
    /// Extra attempts for transient transport failures
    pub retries: u32,
    /// Commit identity (name, email)
    pub author: Option<(String, String)>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: "main".to_string(),
            timeout: Duration::from_secs(30),
            retries: 2,
            author: None,
        }
    }
}

impl SyncOptions {
    fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.branch)
    }
}

/// Relationship between local and remote after fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    UpToDate,
    /// Only the remote changed
    FastForward,
    /// Only the local side changed (committed or not)
    LocalAhead,
    /// Both sides changed
    Diverged,
}

impl SyncState {
    pub fn classify(status: &RepoStatus) -> Self {
        let local = status.dirty || status.ahead > 0;
        let remote = status.behind > 0;
        match (local, remote) {
            (false, false) => Self::UpToDate,
            (false, true) => Self::FastForward,
            (true, false) => Self::LocalAhead,
            (true, true) => Self::Diverged,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpToDate => "up-to-date",
            Self::FastForward => "fast-forward",
            Self::LocalAhead => "local-ahead",
            Self::Diverged => "diverged",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The state that was found and resolved
    pub state: SyncState,
    /// The store file changed on disk; in-memory collections are stale
    pub needs_reload: bool,
}

impl SyncOutcome {
    pub fn summary(&self) -> &'static str {
        match self.state {
            SyncState::UpToDate => "Already up to date",
            SyncState::FastForward => "Pulled remote changes",
            SyncState::LocalAhead => "Pushed local changes",
            SyncState::Diverged => "Merged local and remote changes",
        }
    }
}

/// What `SyncEngine::init` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The directory was empty and the remote was cloned into it
    Cloned,
    /// The directory already was a repository; only the remote URL was set
    RemoteUpdated,
    /// A new repository was created and reconciled with the remote
    Initialized(SyncOutcome),
}

/// Keeps one store file in sync with its remote
pub struct SyncEngine<V = GitCli> {
    vcs: V,
    store_path: PathBuf,
    file: PathBuf,
    options: SyncOptions,
}

impl SyncEngine<GitCli> {
    /// Engine for the git repository in the store file's directory
    pub fn new(store_path: impl Into<PathBuf>, options: SyncOptions) -> Self {
        let store_path = store_path.into();
        let git = GitCli::new(repo_dir(&store_path))
            .with_timeout(options.timeout)
            .with_retries(options.retries)
            .with_identity(options.author.clone());
        Self::with_vcs(store_path, options, git)
    }
}

impl<V: VersionControl> SyncEngine<V> {
    pub fn with_vcs(store_path: impl Into<PathBuf>, options: SyncOptions, vcs: V) -> Self {
        let store_path = store_path.into();
        let file = store_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("snippets.toml"));
        Self {
            vcs,
            store_path,
            file,
            options,
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Fetch and classify without changing the local branch or the store file
    pub fn status(&self) -> Result<SyncState> {
        self.ensure_repository()?;
        self.vcs.fetch(&self.options.remote)?;
        let status = self.vcs.status(&self.file, &self.options.upstream())?;
        Ok(SyncState::classify(&status))
    }

    /// Run one pull-merge-push cycle
    ///
    /// Running it again right after a success is a no-op.
    pub fn sync(&self) -> Result<SyncOutcome> {
        self.ensure_repository()?;
        let upstream = self.options.upstream();

        self.vcs.fetch(&self.options.remote)?;
        let status = self.vcs.status(&self.file, &upstream)?;
        let state = SyncState::classify(&status);
        info!(%state, ahead = status.ahead, behind = status.behind, dirty = status.dirty, "sync");

        match state {
            SyncState::UpToDate => Ok(SyncOutcome {
                state,
                needs_reload: false,
            }),
            SyncState::FastForward => {
                self.fast_forward(&upstream)?;
                Ok(SyncOutcome {
                    state,
                    needs_reload: true,
                })
            }
            SyncState::LocalAhead => {
                let original = self.vcs.head()?;
                let committed =
                    status.dirty && self.vcs.stage_and_commit(&self.file, COMMIT_MESSAGE)?;
                if let Err(err) = self.push() {
                    if committed {
                        self.roll_back(None, original.as_deref());
                    }
                    return Err(err);
                }
                Ok(SyncOutcome {
                    state,
                    needs_reload: false,
                })
            }
            SyncState::Diverged => {
                self.merge_and_push(&upstream, status.dirty)?;
                Ok(SyncOutcome {
                    state,
                    needs_reload: true,
                })
            }
        }
    }

    /// Put the store directory under version control with `remote_url`
    ///
    /// - empty or missing directory: clone the remote into it
    /// - existing repository: point the remote at `remote_url`
    /// - unmanaged directory: create a repository, commit the store file if
    ///   there is one, then sync with the remote
    pub fn init(&self, remote_url: &str) -> Result<InitOutcome> {
        let dir = repo_dir(&self.store_path);
        let remote = &self.options.remote;

        if is_empty_dir(&dir)? {
            info!(url = remote_url, dir = %dir.display(), "cloning snippet repository");
            self.vcs
                .clone_from(remote_url, remote, &self.options.branch)?;
            return Ok(InitOutcome::Cloned);
        }

        if self.vcs.is_repository() {
            self.vcs.set_remote(remote, remote_url)?;
            info!(url = remote_url, "updated remote");
            return Ok(InitOutcome::RemoteUpdated);
        }

        info!(dir = %dir.display(), "initializing snippet repository");
        self.vcs.init(&self.options.branch)?;
        self.vcs.set_remote(remote, remote_url)?;
        if self.store_path.exists() {
            self.vcs.stage_and_commit(&self.file, INIT_MESSAGE)?;
        }

        Ok(InitOutcome::Initialized(self.sync()?))
    }

    fn ensure_repository(&self) -> Result<()> {
        if self.vcs.is_repository() {
            Ok(())
        } else {
            Err(Error::sync(format!(
                "{} is not under version control; run sync-init first",
                repo_dir(&self.store_path).display()
            )))
        }
    }

    /// Fast-forward, refusing a remote store that does not load
    fn fast_forward(&self, upstream: &str) -> Result<()> {
        let before = self.vcs.head()?;
        self.vcs.fast_forward(upstream)?;

        if let Err(err) = store::load(&self.store_path) {
            warn!(error = %err, "remote store does not load, rolling back");
            self.roll_back(before.as_deref(), None);
            return Err(Error::sync(format!("the remote store is unusable: {err}")));
        }
        Ok(())
    }

    /// Commit local edits, merge `upstream` and push the result
    ///
    /// If any step fails, HEAD and the store file go back to what they were
    /// before the sync started.
    fn merge_and_push(&self, upstream: &str, dirty: bool) -> Result<()> {
        let original = self.vcs.head()?;
        let committed = dirty && self.vcs.stage_and_commit(&self.file, COMMIT_MESSAGE)?;
        let pre_merge = self.vcs.head()?;

        let result = self.try_merge(upstream).and_then(|()| self.push());
        if let Err(err) = &result {
            warn!(error = %err, "sync failed, restoring local state");
            let original = if committed { original.as_deref() } else { None };
            self.roll_back(pre_merge.as_deref(), original);
        }
        result
    }

    fn push(&self) -> Result<()> {
        self.vcs.push(&self.options.remote, &self.options.branch)?;
        Ok(())
    }

    /// Hard reset to `hard`, then soft reset to `soft`, keeping the working file
    ///
    /// Failures are logged only; the caller reports the error that caused the
    /// rollback.
    fn roll_back(&self, hard: Option<&str>, soft: Option<&str>) {
        let steps = [(hard, ResetMode::Hard), (soft, ResetMode::Soft)];
        for (rev, mode) in steps {
            let Some(rev) = rev else { continue };
            if let Err(err) = self.vcs.reset_to(rev, mode) {
                warn!(error = %err, rev, ?mode, "could not restore local state");
            }
        }
    }

    fn try_merge(&self, upstream: &str) -> Result<()> {
        if self.vcs.merge(upstream)? {
            // a clean textual merge can still produce an invalid store
            // (e.g. the same alias added on both sides)
            if let Err(err) = store::load(&self.store_path) {
                debug!(error = %err, "textual merge result does not load");
                return Err(self.conflict());
            }
            return Ok(());
        }

        let conflicted = self.vcs.conflicted_paths()?;
        self.vcs.abort_merge()?;

        if !conflicted.iter().any(|path| path == &self.file) {
            let paths: Vec<String> = conflicted
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            return Err(Error::sync(format!(
                "merge conflict outside the store file: {}",
                paths.join(", ")
            )));
        }

        self.merge_snippets(upstream)
    }

    /// Resolve a textual conflict snippet by snippet
    fn merge_snippets(&self, upstream: &str) -> Result<()> {
        let base = match self.vcs.merge_base("HEAD", upstream)? {
            Some(rev) => self.collection_at(&rev)?,
            None => Collection::new(),
        };
        let ours = self.collection_at("HEAD")?;
        let theirs = self.collection_at(upstream)?;

        let merged = Collection::merge(&base, &ours, &theirs).map_err(|ids| {
            info!(snippets = ?ids, "snippets edited on both sides");
            self.conflict()
        })?;

        self.vcs.merge_keeping_ours(upstream)?;
        store::save(&merged, &self.store_path)?;
        self.vcs.stage_and_commit(&self.file, MERGE_MESSAGE)?;
        debug!(snippets = merged.len(), "merged snippet by snippet");
        Ok(())
    }

    fn collection_at(&self, rev: &str) -> Result<Collection> {
        let label = PathBuf::from(format!("{rev}:{}", self.file.display()));
        match self.vcs.show(rev, &self.file)? {
            Some(content) => store::parse(&content, &label).map_err(|err| {
                debug!(error = %err, rev, "store does not parse at revision");
                self.conflict()
            }),
            None => Ok(Collection::new()),
        }
    }

    fn conflict(&self) -> Error {
        Error::SyncConflict {
            path: self.store_path.clone(),
        }
    }
}

fn repo_dir(store_path: &Path) -> PathBuf {
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Whether `err` came from a remote that refused or could not be reached
pub fn is_network_error(err: &Error) -> bool {
    match err {
        Error::Sync {
            source: Some(source),
            ..
        } => matches!(
            source.downcast_ref::<VcsError>(),
            Some(VcsError::Auth { .. } | VcsError::Transport { .. } | VcsError::TimedOut { .. })
        ),
        _ => false,
    }
}
