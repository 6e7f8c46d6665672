//! Lock helpers that recover from poisoning instead of propagating panics.
//!
//! A panic on one thread must not take the whole session down with it; a
//! poisoned lock is logged and the inner value is used as-is.

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use tracing::warn;

pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned mutex");
        poisoned.into_inner()
    })
}

pub fn rwlock_read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned rwlock (read)");
        poisoned.into_inner()
    })
}

pub fn rwlock_write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned rwlock (write)");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mutex_lock_plain() {
        let lock = Mutex::new(5);
        assert_eq!(*mutex_lock_or_recover(&lock), 5);
    }

    #[test]
    fn test_mutex_lock_recovers_after_poison() {
        let lock = Arc::new(Mutex::new(5));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(*mutex_lock_or_recover(&lock), 5);
    }

    #[test]
    fn test_rwlock_recovers_after_poison() {
        let lock = Arc::new(RwLock::new(String::from("state")));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(*rwlock_read_or_recover(&lock), "state");
        rwlock_write_or_recover(&lock).push_str(" updated");
        assert_eq!(*rwlock_read_or_recover(&lock), "state updated");
    }
}
