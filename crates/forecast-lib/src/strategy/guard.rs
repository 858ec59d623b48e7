//! At-most-once lazy initialization

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::error;

/// Observable load state of a lazily initialized resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// One-shot load cell
///
/// Exactly one caller runs the loader; concurrent callers block until the
/// outcome is recorded and then share it. Failures are recorded like
/// successes and never retried; a panicking loader counts as a failure.
pub struct LoadGuard<T> {
    cell: OnceLock<Result<T>>,
    loading: AtomicBool,
}

impl<T> LoadGuard<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// A guard that is already loaded with `value`
    pub fn ready(value: T) -> Self {
        let guard = Self::new();
        let _ = guard.cell.set(Ok(value));
        guard
    }

    /// Return the loaded value, running `load` if nobody has yet
    pub fn get_or_load<F>(&self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(outcome) = self.cell.get() {
            return outcome.as_ref().map_err(Clone::clone);
        }

        let _loading = LoadingFlag::raise(&self.loading);
        self.cell
            .get_or_init(|| {
                panic::catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    error!(error = %message, "Loader panicked");
                    Err(ForecastError::configuration(format!(
                        "Loader panicked: {}",
                        message
                    )))
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Loaded value, if the load already completed successfully
    pub fn get(&self) -> Option<&T> {
        self.cell.get().and_then(|r| r.as_ref().ok())
    }

    /// Recorded failure, if the load already failed
    pub fn failure(&self) -> Option<&ForecastError> {
        self.cell.get().and_then(|r| r.as_ref().err())
    }

    pub fn state(&self) -> LoadState {
        match self.cell.get() {
            Some(Ok(_)) => LoadState::Loaded,
            Some(Err(_)) => LoadState::Failed,
            None if self.loading.load(Ordering::Acquire) => LoadState::Loading,
            None => LoadState::Unloaded,
        }
    }
}

impl<T> Default for LoadGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the `loading` flag up until dropped, even on unwind
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_initial_state_unloaded() {
        let guard: LoadGuard<u32> = LoadGuard::new();
        assert_eq!(guard.state(), LoadState::Unloaded);
        assert!(guard.get().is_none());
    }

    #[test]
    fn test_ready_guard_skips_loader() {
        let guard = LoadGuard::ready(7u32);
        let value = guard.get_or_load(|| panic!("loader must not run")).unwrap();
        assert_eq!(*value, 7);
        assert_eq!(guard.state(), LoadState::Loaded);
    }

    #[test]
    fn test_failure_recorded_and_not_retried() {
        let guard: LoadGuard<u32> = LoadGuard::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let err = guard
                .get_or_load(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ForecastError::configuration("missing artifact"))
                })
                .unwrap_err();
            assert_eq!(err, ForecastError::configuration("missing artifact"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), LoadState::Failed);
        assert!(guard.failure().is_some());
    }

    #[test]
    fn test_panicking_loader_recorded_as_failure() {
        let guard: LoadGuard<u32> = LoadGuard::new();
        let calls = AtomicUsize::new(0);

        let err = guard
            .get_or_load(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                panic!("corrupt weights blob")
            })
            .unwrap_err();
        assert!(matches!(err, ForecastError::Configuration(ref msg) if msg.contains("corrupt weights blob")));
        assert_eq!(guard.state(), LoadState::Failed);

        let again = guard
            .get_or_load(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap_err();
        assert_eq!(again, err);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), LoadState::Failed);
    }

    #[test]
    fn test_load_state_round_trips_lowercase() {
        let json = serde_json::to_string(&LoadState::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
        let state: LoadState = serde_json::from_str("\"loading\"").unwrap();
        assert_eq!(state, LoadState::Loading);
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let guard = Arc::new(LoadGuard::<u64>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    *guard
                        .get_or_load(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
