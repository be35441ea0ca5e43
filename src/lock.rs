//! Process-wide write serialization per physical file.
//!
//! Every read-modify-write of a config file runs inside [`with_path_lock`], so
//! two writers in the same process never interleave on one path. Paths are
//! keyed by their absolute form; distinct spellings of the same file share a
//! lock as long as they resolve to the same absolute path. Nothing here guards
//! against other processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

static PATH_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    PATH_LOCKS.lock().entry(key).or_default().clone()
}

/// Run `f` while holding the exclusive write lock for `path`.
///
/// Not reentrant: calling it again for the same path inside `f` deadlocks.
/// Callers that need two files always take them in the same order.
pub fn with_path_lock<T>(path: &Path, f: impl FnOnce() -> T) -> T {
    let lock = lock_for(path);
    let _guard = lock.lock();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn same_path_shares_a_lock() {
        let a = lock_for(Path::new("/tmp/gatecfg-lock/user_config.yaml"));
        let b = lock_for(Path::new("/tmp/gatecfg-lock/./user_config.yaml"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_paths_do_not_share() {
        let a = lock_for(Path::new("/tmp/gatecfg-lock/network.yaml"));
        let b = lock_for(Path::new("/tmp/gatecfg-lock/wifi.yaml"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_read_modify_write_loses_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter");
        fs::write(&path, "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        with_path_lock(&path, || {
                            let n: u32 = fs::read_to_string(&path).unwrap().parse().unwrap();
                            fs::write(&path, (n + 1).to_string()).unwrap();
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "200");
    }
}
