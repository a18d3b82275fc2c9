//! A [`Mutex`] that never poisons.
//!
//! Same API shape as [`std::sync::Mutex`], but `lock` does **not return**
//! [`std::sync::PoisonError`] even if a thread panicked while holding the lock.
//! Guards the shared stream of a [`Body`](crate::Body).

use std::{
    ops::{Deref, DerefMut},
    sync,
};

/// A [`Mutex`] that never poisons and has the same interface as [`std::sync::Mutex`].
pub(crate) struct Mutex<T: ?Sized>(sync::Mutex<T>);

impl<T> Mutex<T> {
    /// Like [`std::sync::Mutex::new`].
    #[inline]
    pub(crate) fn new(t: T) -> Mutex<T> {
        Mutex(sync::Mutex::new(t))
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Like [`std::sync::Mutex::lock`].
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard(self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Like [`std::sync::MutexGuard`].
#[must_use]
pub(crate) struct MutexGuard<'a, T: ?Sized + 'a>(sync::MutexGuard<'a, T>);

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.0.deref()
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.0.deref_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::Mutex;

    #[test]
    fn lock_after_panic() {
        let mutex = Arc::new(Mutex::new(Some(1)));
        let poisoner = mutex.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison");
        })
        .join();

        assert_eq!(mutex.lock().take(), Some(1));
        assert_eq!(*mutex.lock(), None);
    }
}
