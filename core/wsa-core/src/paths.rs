//! Signal directory discovery.
//!
//! The WSA daemon watches a `.wsa` directory at the root of the hosting
//! account. Clients rarely know where that root is, so the resolver tries, in
//! order:
//!
//! 1. **Explicit path**: a caller-supplied account root, used when `.wsa`
//!    under it is writable.
//! 2. **First guess**: hosting accounts are laid out as `/<webroot>/<account>/`,
//!    so the first two segments of the origin usually are the account root.
//! 3. **Upward search**: `<origin>/.wsa`, then one level up, and so on, for at
//!    most `min(MAX_BACKTRACE, depth(origin))` existence checks.
//!
//! The result is recomputed on every call and never cached. Failure means
//! "no accelerator here", not an error worth aborting for.

#[cfg(not(unix))]
use fs_err as fs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use wsa_protocol::{MAX_BACKTRACE, SENTINEL_FILE_NAME, SIGNAL_DIR_MODE, SIGNAL_DIR_NAME};

use crate::error::{Result, WsaError};

/// Account-root segments are plain identifiers (cPanel user names, webroot names).
static RE_ACCOUNT_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// How a [`SignalDirectory`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    Explicit,
    FirstGuess,
    /// Found by the upward search, `levels` directories above the origin.
    Backtrace { levels: usize },
}

/// A directory believed to be shared with the WSA daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDirectory {
    path: PathBuf,
    source: DiscoverySource,
}

impl SignalDirectory {
    pub fn new(path: PathBuf, source: DiscoverySource) -> Self {
        Self { path, source }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> DiscoverySource {
        self.source
    }

    /// Path of the `empty.me` sentinel inside this directory.
    pub fn sentinel_path(&self) -> PathBuf {
        self.path.join(SENTINEL_FILE_NAME)
    }

    /// The directory containing `.wsa`, i.e. what callers pass as an
    /// explicit path to land on this same directory again.
    pub fn account_root(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn is_writable(&self) -> bool {
        is_writable_dir(&self.path)
    }

    /// Creates the directory with mode 0750 if it is missing.
    ///
    /// Another process creating it first is not an error as long as the
    /// directory is there afterwards.
    pub fn ensure_exists(&self) -> Result<()> {
        let mut builder = std::fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(SIGNAL_DIR_MODE);
        }

        match builder.create(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Created signal directory");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists && self.path.is_dir() => {
                debug!(path = %self.path.display(), "Signal directory already present");
                Ok(())
            }
            Err(source) => Err(WsaError::DirectoryCreate {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Locates the signal directory for a given origin.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Root under which the first-guess layout is interpreted (`/` in production).
    root: PathBuf,
    /// Where the search starts from.
    origin: PathBuf,
    max_backtrace: usize,
}

impl PathResolver {
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            root: PathBuf::from("/"),
            origin: origin.into(),
            max_backtrace: MAX_BACKTRACE,
        }
    }

    /// Resolver rooted at the process working directory.
    pub fn from_current_dir() -> Result<Self> {
        let origin = std::env::current_dir().map_err(|source| WsaError::Io {
            context: "reading current directory".to_string(),
            source,
        })?;
        Ok(Self::new(origin))
    }

    /// Interprets the first-guess layout below `root` instead of `/`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_max_backtrace(mut self, max_backtrace: usize) -> Self {
        self.max_backtrace = max_backtrace;
        self
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the signal directory, preferring `explicit` when it is usable.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<SignalDirectory> {
        if let Some(explicit) = explicit {
            let candidate = explicit_candidate(explicit);
            if is_writable_dir(&candidate) {
                debug!(path = %candidate.display(), "Using explicit signal directory");
                return Ok(SignalDirectory::new(candidate, DiscoverySource::Explicit));
            }
            debug!(
                path = %candidate.display(),
                "Explicit signal directory not writable, falling back to discovery"
            );
        }

        self.discover()
    }

    /// Runs the first-guess step and then the bounded upward search.
    pub fn discover(&self) -> Result<SignalDirectory> {
        if let Some(guess) = first_guess(&self.root, &self.origin) {
            if guess.exists() {
                debug!(path = %guess.display(), "Signal directory found by first guess");
                return Ok(SignalDirectory::new(guess, DiscoverySource::FirstGuess));
            }
            debug!(path = %guess.display(), "First-guess signal directory missing");
        }

        for (levels, candidate) in backtrace_candidates(&self.origin, self.max_backtrace) {
            if candidate.exists() {
                debug!(
                    path = %candidate.display(),
                    levels,
                    "Signal directory found by upward search"
                );
                return Ok(SignalDirectory::new(
                    candidate,
                    DiscoverySource::Backtrace { levels },
                ));
            }
        }

        debug!(origin = %self.origin.display(), "No signal directory found");
        Err(WsaError::PathUnavailable {
            origin: self.origin.clone(),
        })
    }
}

/// `/<explicit without surrounding slashes>/.wsa`
fn explicit_candidate(explicit: &Path) -> PathBuf {
    let raw = explicit.to_string_lossy();
    let trimmed = raw.trim_matches('/');
    PathBuf::from("/").join(trimmed).join(SIGNAL_DIR_NAME)
}

/// Builds `<root>/<first>/<second>/.wsa` from the first two segments of
/// `origin` below `root`.
///
/// Returns `None` when the origin is not under `root`, has fewer than two
/// segments, or a segment is not a plain identifier.
pub fn first_guess(root: &Path, origin: &Path) -> Option<PathBuf> {
    let relative = origin.strip_prefix(root).ok()?;
    let mut segments = relative.components().filter_map(|component| match component {
        Component::Normal(name) => name.to_str(),
        _ => None,
    });

    let webroot = segments.next()?;
    let account = segments.next()?;
    if !RE_ACCOUNT_SEGMENT.is_match(webroot) || !RE_ACCOUNT_SEGMENT.is_match(account) {
        return None;
    }

    Some(root.join(webroot).join(account).join(SIGNAL_DIR_NAME))
}

/// Number of named components in `origin` (`/` has depth 0).
pub fn directory_depth(origin: &Path) -> usize {
    origin
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count()
}

/// Candidates for the upward search, nearest first, paired with how many
/// levels above the origin each one sits.
///
/// Never yields more than `min(max_backtrace, directory_depth(origin))`
/// entries.
pub fn backtrace_candidates(origin: &Path, max_backtrace: usize) -> Vec<(usize, PathBuf)> {
    let bound = max_backtrace.min(directory_depth(origin));
    origin
        .ancestors()
        .take(bound)
        .enumerate()
        .map(|(levels, dir)| (levels, dir.join(SIGNAL_DIR_NAME)))
        .collect()
}

/// True when `path` is a directory this process may create files in.
pub fn is_writable_dir(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: c_path is a live, NUL-terminated CString for the whole call.
        unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
    }
    #[cfg(not(unix))]
    {
        fs::metadata(path)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_candidate_trims_slashes() {
        assert_eq!(
            explicit_candidate(Path::new("/home/user42/")),
            PathBuf::from("/home/user42/.wsa")
        );
        assert_eq!(
            explicit_candidate(Path::new("home/user42")),
            PathBuf::from("/home/user42/.wsa")
        );
        assert_eq!(explicit_candidate(Path::new("/")), PathBuf::from("/.wsa"));
    }

    #[test]
    fn first_guess_uses_first_two_segments() {
        let guess = first_guess(
            Path::new("/"),
            Path::new("/home/user42/public_html/wp-content/plugins"),
        );
        assert_eq!(guess, Some(PathBuf::from("/home/user42/.wsa")));
    }

    #[test]
    fn first_guess_skipped_for_shallow_origin() {
        assert_eq!(first_guess(Path::new("/"), Path::new("/home")), None);
        assert_eq!(first_guess(Path::new("/"), Path::new("/")), None);
    }

    #[test]
    fn first_guess_rejects_non_identifier_segments() {
        assert_eq!(
            first_guess(Path::new("/"), Path::new("/home/user.name/public_html")),
            None
        );
        assert_eq!(
            first_guess(Path::new("/"), Path::new("/home-dir/user/public_html")),
            None
        );
    }

    #[test]
    fn first_guess_requires_origin_under_root() {
        assert_eq!(
            first_guess(Path::new("/srv"), Path::new("/home/user42/public_html")),
            None
        );
    }

    #[test]
    fn depth_counts_named_components() {
        assert_eq!(directory_depth(Path::new("/")), 0);
        assert_eq!(directory_depth(Path::new("/home")), 1);
        assert_eq!(directory_depth(Path::new("/home/user42/public_html/")), 3);
    }

    #[test]
    fn backtrace_is_bounded_by_max() {
        let origin = Path::new("/a/b/c/d/e/f/g");
        let candidates = backtrace_candidates(origin, 5);
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates[0], (0, PathBuf::from("/a/b/c/d/e/f/g/.wsa")));
        assert_eq!(candidates[4], (4, PathBuf::from("/a/b/c/.wsa")));
    }

    #[test]
    fn backtrace_is_bounded_by_depth() {
        for depth in 0..8usize {
            let origin: PathBuf = std::iter::once("/".to_string())
                .chain((0..depth).map(|i| format!("d{i}")))
                .collect();
            let candidates = backtrace_candidates(&origin, MAX_BACKTRACE);
            assert_eq!(candidates.len(), depth.min(MAX_BACKTRACE), "depth {depth}");
        }
    }

    #[test]
    fn backtrace_at_root_yields_nothing() {
        assert!(backtrace_candidates(Path::new("/"), MAX_BACKTRACE).is_empty());
    }

    #[test]
    fn resolve_prefers_writable_explicit_path() {
        let temp = tempdir().unwrap();
        let signal = temp.path().join(".wsa");
        std::fs::create_dir(&signal).unwrap();

        let resolver = PathResolver::new("/nonexistent/origin/dir");
        let dir = resolver.resolve(Some(temp.path())).unwrap();
        assert_eq!(dir.path(), signal);
        assert_eq!(dir.source(), DiscoverySource::Explicit);
        assert_eq!(dir.account_root(), Some(temp.path()));
    }

    #[test]
    fn resolve_falls_back_when_explicit_missing() {
        let temp = tempdir().unwrap();
        let origin = temp.path().join("site");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir(temp.path().join(".wsa")).unwrap();

        let resolver = PathResolver::new(&origin).with_root(temp.path());
        let missing = temp.path().join("missing");
        let dir = resolver.resolve(Some(&missing)).unwrap();
        assert_eq!(dir.path(), temp.path().join(".wsa"));
        assert_eq!(dir.source(), DiscoverySource::Backtrace { levels: 1 });
    }

    #[test]
    fn ensure_exists_creates_missing_directory() {
        let temp = tempdir().unwrap();
        let dir = SignalDirectory::new(temp.path().join(".wsa"), DiscoverySource::Explicit);
        assert!(!dir.exists());

        dir.ensure_exists().unwrap();
        assert!(dir.exists());
        dir.ensure_exists().unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o077, mode & SIGNAL_DIR_MODE & 0o077);
        }
    }

    #[test]
    fn ensure_exists_fails_when_parent_missing() {
        let temp = tempdir().unwrap();
        let dir = SignalDirectory::new(
            temp.path().join("missing").join(".wsa"),
            DiscoverySource::Explicit,
        );
        assert!(matches!(
            dir.ensure_exists(),
            Err(WsaError::DirectoryCreate { .. })
        ));
    }

    #[test]
    fn ensure_exists_rejects_file_in_the_way() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(".wsa");
        std::fs::write(&path, "not a directory").unwrap();
        let dir = SignalDirectory::new(path, DiscoverySource::Explicit);

        assert!(matches!(
            dir.ensure_exists(),
            Err(WsaError::DirectoryCreate { .. })
        ));
    }

    #[test]
    fn writable_dir_rejects_files() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(!is_writable_dir(&file));
        assert!(is_writable_dir(temp.path()));
    }
}
