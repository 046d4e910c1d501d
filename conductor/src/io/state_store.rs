//! Load/save of the workflow record with atomic replace semantics.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::state::WorkflowState;
use crate::error::StateError;
use crate::io::paths::StatePaths;

/// Options for [`init_state`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Replace an existing (or corrupt) state file.
    pub force: bool,
    pub workflow_id: String,
    pub max_iterations: u32,
}

/// Load the record at `path`.
///
/// A missing file is [`StateError::NotFound`]; unreadable or unparseable content
/// is [`StateError::Corrupt`].
pub fn load_state(path: &Path) -> Result<WorkflowState, StateError> {
    debug!(path = %path.display(), "loading state");
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(StateError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) if err.kind() == ErrorKind::InvalidData => {
            return Err(StateError::Corrupt {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
        Err(err) => return Err(StateError::io(path, err)),
    };
    let state: WorkflowState =
        serde_json::from_str(&contents).map_err(|err| StateError::Corrupt {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    debug!(tasks = state.tasks.len(), retries = state.retry_queue.len(), "state loaded");
    Ok(state)
}

/// Like [`load_state`] but a missing file is `Ok(None)`.
pub fn try_load_state(path: &Path) -> Result<Option<WorkflowState>, StateError> {
    match load_state(path) {
        Ok(state) => Ok(Some(state)),
        Err(StateError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Refresh `updated_at` and atomically replace the record at `path`.
///
/// The payload is written and synced to a temp file in the same directory, then
/// renamed over the target. On any failure the temp file is removed and the
/// previous file is left intact.
pub fn save_state(
    path: &Path,
    state: &mut WorkflowState,
    now: DateTime<Utc>,
) -> Result<(), StateError> {
    state.updated_at = now;
    let mut buf = serde_json::to_string_pretty(&*state).map_err(|err| {
        StateError::io(path, std::io::Error::new(ErrorKind::InvalidData, err))
    })?;
    buf.push('\n');
    debug!(path = %path.display(), tasks = state.tasks.len(), "writing state");
    write_atomic(path, buf.as_bytes())
}

/// Create a fresh record under `paths`.
///
/// Refuses to replace an existing file, corrupt or not, unless `options.force`.
pub fn init_state(
    paths: &StatePaths,
    options: &InitOptions,
    now: DateTime<Utc>,
) -> Result<WorkflowState, StateError> {
    if paths.state_path.exists() && !options.force {
        return Err(StateError::AlreadyExists(
            "State exists. Use --force to overwrite.".to_string(),
        ));
    }
    fs::create_dir_all(&paths.state_dir).map_err(|err| StateError::io(&paths.state_dir, err))?;

    let mut state = WorkflowState::new(
        options.workflow_id.clone(),
        paths.root.display().to_string(),
        options.max_iterations,
        now,
    );
    save_state(&paths.state_path, &mut state, now)?;
    info!(path = %paths.state_path.display(), workflow_id = %state.workflow_id, "initialized workflow state");
    Ok(state)
}

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StateError> {
    let parent = path.parent().ok_or_else(|| {
        StateError::io(
            path,
            std::io::Error::new(ErrorKind::InvalidInput, "path has no parent directory"),
        )
    })?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|err| StateError::io(parent, err))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|err| StateError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| StateError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::{add_task, record_checkpoint};
    use crate::core::retry::push_retry;
    use crate::core::session::activate;
    use crate::test_support::{fixed_now, new_task};

    fn init(root: &Path) -> (StatePaths, WorkflowState) {
        let paths = StatePaths::new(root);
        let options = InitOptions {
            workflow_id: "STORY-1".to_string(),
            max_iterations: 30,
            ..InitOptions::default()
        };
        let state = init_state(&paths, &options, fixed_now()).expect("init");
        (paths, state)
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_state(&temp.path().join("state.json")).unwrap_err();
        assert!(matches!(err, StateError::NotFound { .. }));
        assert!(
            try_load_state(&temp.path().join("state.json"))
                .expect("try load")
                .is_none()
        );
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        fs::write(&path, "{\"version\": \"2.0\", \"tasks\": [").expect("write");
        let err = load_state(&path).unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
    }

    #[test]
    fn save_then_load_preserves_every_field() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, mut state) = init(temp.path());

        add_task(&mut state, new_task("1.1", &[])).expect("add");
        state.tasks[0].duration_s = 12.345_678_901_234_5;
        push_retry(&mut state, "1.1", 1, "flaky", fixed_now()).expect("push");
        record_checkpoint(&mut state, "abc", "1.1", "msg", fixed_now()).expect("ckpt");
        activate(&mut state.session, "s-1", "STORY-1", 1_760_000_000_123);
        state.cost.estimated_cost_usd = 0.1 + 0.2;

        save_state(&paths.state_path, &mut state, fixed_now()).expect("save");
        let loaded = load_state(&paths.state_path).expect("load");
        assert_eq!(loaded, state);

        let raw = fs::read_to_string(&paths.state_path).expect("read");
        assert!(raw.contains("\"last_activity\": 1760000000123"));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn save_refreshes_updated_at_and_leaves_no_temp_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, mut state) = init(temp.path());
        let later = fixed_now() + chrono::Duration::seconds(5);
        save_state(&paths.state_path, &mut state, later).expect("save");
        assert_eq!(state.updated_at, later);
        assert_eq!(state.created_at, fixed_now());

        let entries: Vec<_> = fs::read_dir(&paths.state_dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn failed_save_removes_temp_file_and_keeps_target() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StatePaths::new(temp.path());
        fs::create_dir_all(paths.state_path.join("nested")).expect("dir in place of state file");
        let marker = paths.state_path.join("nested").join("keep.txt");
        fs::write(&marker, "previous").expect("write marker");

        let mut state = WorkflowState::new("wf", "/tmp/project", 30, fixed_now());
        let err = save_state(&paths.state_path, &mut state, fixed_now()).unwrap_err();
        assert!(matches!(err, StateError::Io { .. }), "{err}");

        let entries: Vec<_> = fs::read_dir(&paths.state_dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
        assert!(paths.state_path.is_dir());
        assert_eq!(fs::read_to_string(&marker).expect("marker"), "previous");
    }

    #[test]
    fn init_refuses_existing_state_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (paths, _) = init(temp.path());
        let err = init_state(&paths, &InitOptions::default(), fixed_now()).unwrap_err();
        assert!(matches!(err, StateError::AlreadyExists(_)));

        fs::write(&paths.state_path, "not json").expect("corrupt");
        assert!(init_state(&paths, &InitOptions::default(), fixed_now()).is_err());

        let forced = InitOptions {
            force: true,
            max_iterations: 5,
            ..InitOptions::default()
        };
        let state = init_state(&paths, &forced, fixed_now()).expect("forced init");
        assert_eq!(state.max_iterations, 5);
        assert!(load_state(&paths.state_path).expect("load").tasks.is_empty());
    }
}
