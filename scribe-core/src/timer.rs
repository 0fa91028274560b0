//! Foreground time accounting for the writing task page.
//!
//! Time accrues only while the page is focused. Accrued time is flushed
//! into the document (and thus session storage) every few seconds and
//! always on blur, so a crash loses at most one flush interval.

use crate::store::SharedStore;
use std::time::{Duration, Instant};

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct ActiveTimer {
    active_since: Option<Instant>,
    unflushed: Duration,
}

impl ActiveTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self) {
        self.focus_at(Instant::now());
    }

    pub fn focus_at(&mut self, now: Instant) {
        if self.active_since.is_none() {
            self.active_since = Some(now);
        }
    }

    pub fn blur(&mut self, store: &SharedStore) {
        self.blur_at(store, Instant::now());
    }

    pub fn blur_at(&mut self, store: &SharedStore, now: Instant) {
        self.accumulate(now);
        self.active_since = None;
        self.flush(store);
    }

    /// Periodic tick while focused; flushes once enough time has accrued.
    pub fn tick(&mut self, store: &SharedStore) {
        self.tick_at(store, Instant::now());
    }

    pub fn tick_at(&mut self, store: &SharedStore, now: Instant) {
        self.accumulate(now);
        if self.active_since.is_some() {
            self.active_since = Some(now);
        }
        if self.unflushed >= FLUSH_INTERVAL {
            self.flush(store);
        }
    }

    /// Total elapsed milliseconds including any unflushed running time.
    pub fn current_elapsed(&self, store: &SharedStore) -> u64 {
        let stored = store
            .lock()
            .expect("store lock poisoned")
            .document()
            .writing
            .elapsed_ms;
        let running = self
            .active_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        stored + (self.unflushed + running).as_millis() as u64
    }

    fn accumulate(&mut self, now: Instant) {
        if let Some(since) = self.active_since {
            self.unflushed += now.saturating_duration_since(since);
        }
    }

    fn flush(&mut self, store: &SharedStore) {
        if self.unflushed.is_zero() {
            return;
        }
        let ms = self.unflushed.as_millis() as u64;
        self.unflushed = Duration::ZERO;
        store
            .lock()
            .expect("store lock poisoned")
            .update(|doc| doc.writing.elapsed_ms += ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::SurveyStore;
    use std::sync::{Arc, Mutex};

    fn store() -> SharedStore {
        SurveyStore::shared(Arc::new(Mutex::new(MemoryStorage::new())))
    }

    fn elapsed(store: &SharedStore) -> u64 {
        store.lock().unwrap().document().writing.elapsed_ms
    }

    #[test]
    fn test_blur_flushes_focused_time() {
        let store = store();
        let mut timer = ActiveTimer::new();
        let t0 = Instant::now();

        timer.focus_at(t0);
        timer.blur_at(&store, t0 + Duration::from_millis(1200));
        assert_eq!(elapsed(&store), 1200);
    }

    #[test]
    fn test_unfocused_time_not_counted() {
        let store = store();
        let mut timer = ActiveTimer::new();
        let t0 = Instant::now();

        timer.focus_at(t0);
        timer.blur_at(&store, t0 + Duration::from_millis(500));
        // A long blur gap, then another short focus window.
        timer.focus_at(t0 + Duration::from_secs(60));
        timer.blur_at(&store, t0 + Duration::from_secs(60) + Duration::from_millis(300));
        assert_eq!(elapsed(&store), 800);
    }

    #[test]
    fn test_tick_flushes_after_interval() {
        let store = store();
        let mut timer = ActiveTimer::new();
        let t0 = Instant::now();

        timer.focus_at(t0);
        timer.tick_at(&store, t0 + Duration::from_secs(1));
        assert_eq!(elapsed(&store), 0);

        timer.tick_at(&store, t0 + Duration::from_secs(4));
        assert_eq!(elapsed(&store), 4000);
    }

    #[test]
    fn test_current_elapsed_includes_unflushed() {
        let store = store();
        let mut timer = ActiveTimer::new();
        let t0 = Instant::now();

        timer.focus_at(t0);
        timer.tick_at(&store, t0 + Duration::from_secs(1));
        assert!(timer.current_elapsed(&store) >= 1000);
    }
}
