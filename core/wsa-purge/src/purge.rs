//! Purge requests and sentinel housekeeping.
//!
//! ```bash
//! wsa-purge purge                 # current domain
//! wsa-purge purge --all           # every domain of the account
//! wsa-purge content-saved         # publishing hook, honours auto_purge
//! wsa-purge clean                 # drop a sentinel nobody consumed
//! ```

use std::path::Path;
use tracing::info;
use wsa_core::on_content_saved;

use crate::app::{App, CommandError};

pub fn run(app: &App, all: bool, path: Option<&Path>) -> Result<(), CommandError> {
    let receipt = app.signal.try_request_purge(all, path)?;
    println!(
        "Purge requested ({}): {}",
        receipt.content,
        receipt.sentinel.display()
    );
    Ok(())
}

pub fn run_content_saved(app: &App) -> Result<(), CommandError> {
    match on_content_saved(&app.config, &app.signal) {
        None => {
            info!("Auto-purge disabled");
            Ok(())
        }
        Some(true) => Ok(()),
        Some(false) => Err(CommandError::Failed(
            "Auto-purge request was not written".to_string(),
        )),
    }
}

pub fn run_clean(app: &App, path: Option<&Path>) -> Result<(), CommandError> {
    if app.signal.clear_sentinel(path) {
        Ok(())
    } else {
        Err(CommandError::Failed(
            "No usable signal directory to clean".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::app_in;
    use tempfile::tempdir;
    use wsa_core::{WsaConfig, WsaError};
    use wsa_protocol::PURGE_ALL_MARKER;

    fn sentinel(root: &Path) -> std::path::PathBuf {
        root.join(".wsa").join("empty.me")
    }

    #[test]
    fn purge_writes_current_domain() {
        let temp = tempdir().unwrap();
        fs_err::create_dir(temp.path().join(".wsa")).unwrap();
        let app = app_in(temp.path(), None);

        run(&app, false, None).unwrap();
        assert_eq!(
            fs_err::read_to_string(sentinel(temp.path())).unwrap(),
            "shop.example.com"
        );

        run(&app, true, None).unwrap();
        assert_eq!(
            fs_err::read_to_string(sentinel(temp.path())).unwrap(),
            PURGE_ALL_MARKER
        );
    }

    #[test]
    fn purge_without_directory_fails() {
        let temp = tempdir().unwrap();
        let app = app_in(&temp.path().join("nowhere"), None);

        let result = run(&app, false, None);
        assert!(matches!(
            result,
            Err(CommandError::Wsa(WsaError::PathUnavailable { .. }))
        ));
    }

    #[test]
    fn content_saved_respects_auto_purge() {
        let temp = tempdir().unwrap();
        fs_err::create_dir(temp.path().join(".wsa")).unwrap();
        let mut app = app_in(temp.path(), None);
        app.config = WsaConfig {
            auto_purge: false,
            ..WsaConfig::default()
        };

        run_content_saved(&app).unwrap();
        assert!(!sentinel(temp.path()).exists());

        app.config.auto_purge = true;
        run_content_saved(&app).unwrap();
        assert!(sentinel(temp.path()).exists());
    }

    #[test]
    fn clean_removes_leftover_sentinel() {
        let temp = tempdir().unwrap();
        fs_err::create_dir(temp.path().join(".wsa")).unwrap();
        fs_err::write(sentinel(temp.path()), "shop.example.com").unwrap();
        let app = app_in(temp.path(), None);

        run_clean(&app, None).unwrap();
        assert!(!sentinel(temp.path()).exists());
        // Nothing left to remove is still fine.
        run_clean(&app, None).unwrap();
    }
}
