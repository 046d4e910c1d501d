//! Canonical locations under `<root>/.conductor/`.

use std::path::PathBuf;

pub const STATE_DIR_NAME: &str = ".conductor";

#[derive(Debug, Clone)]
pub struct StatePaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub state_path: PathBuf,
    pub lock_path: PathBuf,
    pub config_path: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(STATE_DIR_NAME);
        Self {
            root,
            state_path: state_dir.join("state.json"),
            lock_path: state_dir.join("state.lock"),
            config_path: state_dir.join("config.toml"),
            state_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_lives_under_the_state_dir() {
        let paths = StatePaths::new("/work/project");
        assert_eq!(paths.state_dir, PathBuf::from("/work/project/.conductor"));
        assert_eq!(
            paths.state_path,
            PathBuf::from("/work/project/.conductor/state.json")
        );
        assert!(paths.lock_path.starts_with(&paths.state_dir));
        assert!(paths.config_path.starts_with(&paths.state_dir));
    }
}
