#[cfg(test)]
pub mod test {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tempfile::TempDir;

    use crate::layout::Layout;
    use crate::resolve::Resolver;
    use crate::store::{ConfigStore, Gatecfg};
    use crate::system::{ApplyError, SystemControl};
    use crate::types::Document;

    /// Parse an inline YAML mapping.
    pub fn doc(yaml: &str) -> Document {
        serde_yaml::from_str(yaml).unwrap()
    }

    /// A throwaway config directory.
    pub struct TestRoot {
        dir: TempDir,
    }

    impl TestRoot {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        pub fn write(&self, name: &str, yaml: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, yaml).unwrap();
            path
        }

        pub fn read(&self, name: &str) -> Document {
            let content = std::fs::read_to_string(self.dir.path().join(name)).unwrap();
            serde_yaml::from_str(&content).unwrap()
        }

        pub fn layout(&self) -> Layout {
            Layout::new(self.dir.path(), "yaml")
        }

        pub fn resolver(&self) -> Resolver {
            Resolver::new(self.layout())
        }

        pub fn store(&self) -> ConfigStore {
            Gatecfg::builder().config_dir(self.path()).build().unwrap()
        }

        pub fn store_with(&self, system: Arc<RecordingSystem>) -> ConfigStore {
            Gatecfg::builder()
                .config_dir(self.path())
                .system(system)
                .build()
                .unwrap()
        }
    }

    // -- Fixture for live-apply tests -------------------------------------------

    /// Records every apply call; fails all of them when `failing`.
    #[derive(Default)]
    pub struct RecordingSystem {
        pub calls: Mutex<Vec<(String, String)>>,
        failing: bool,
    }

    impl RecordingSystem {
        pub fn failing() -> Self {
            Self {
                calls: Mutex::default(),
                failing: true,
            }
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().clone()
        }

        fn record(&self, setting: &str, value: &str) -> Result<(), ApplyError> {
            self.calls.lock().push((setting.into(), value.into()));
            if self.failing {
                return Err(ApplyError::Failed {
                    command: format!("set-{setting} {value}"),
                    status: "exit status: 1".into(),
                });
            }
            Ok(())
        }
    }

    impl SystemControl for RecordingSystem {
        fn set_hostname(&self, hostname: &str) -> Result<(), ApplyError> {
            self.record("hostname", hostname)
        }

        fn set_timezone(&self, timezone: &str) -> Result<(), ApplyError> {
            self.record("timezone", timezone)
        }
    }

    #[test]
    fn test_root_round_trips_files() {
        let root = TestRoot::new();
        root.write("user_config.yaml", "system: {hostname: gw}\n");
        assert_eq!(root.read("user_config.yaml"), doc("system: {hostname: gw}"));
    }
}
