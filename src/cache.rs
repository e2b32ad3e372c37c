//! Predicate-keyed bitmap cache with background population.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use tracing::{debug, warn};

use crate::catalog::BlockMeta;
use crate::error::TurnstileError;
use crate::expr::Expr;
use crate::filter;

/// Capabilities a predicate needs to serve as a cache key.
///
/// Blanket-implemented; any equatable, hashable, shareable type qualifies.
pub trait PredicateKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> PredicateKey for T {}

/// Time source for idle-expiry decisions, swappable so TTL behavior can be
/// driven from tests.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct CacheEntry {
    bitmap: RoaringBitmap,
    last_access: Instant,
}

struct BuildBatch<P> {
    predicates: Vec<(P, Expr)>,
    blocks: Arc<[BlockMeta]>,
}

/// Concurrent map from predicate to the set of block ordinals it may match.
///
/// Entries expire independently after an idle window and are evicted lazily
/// on the next access. The store is a single coarse mutex with short
/// critical sections: it sits on the cold path, so write throughput is
/// traded for simplicity. Population runs on one background worker thread,
/// so full-block scans never race each other, and the synchronous path
/// never waits for one.
///
/// A bitmap, once visible to [`lookup`](BitmapCache::lookup), always covers
/// the full block range it was built over; partial bitmaps are never
/// inserted. Rebuilding a predicate that is already cached is wasted work
/// but not a correctness problem: bitmaps for one predicate over one block
/// list are identical, and the last writer wins.
#[derive(Debug)]
pub struct BitmapCache<P: PredicateKey> {
    entries: Arc<Mutex<HashMap<P, CacheEntry>>>,
    queue: Sender<BuildBatch<P>>,
    clock: Arc<dyn Clock>,
    idle_ttl: Duration,
}

impl<P: PredicateKey> BitmapCache<P> {
    /// Creates a cache whose entries expire after `idle_ttl` of disuse, with
    /// a build queue holding at most `queue_capacity` pending batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the background worker thread cannot be spawned.
    pub fn try_new(idle_ttl: Duration, queue_capacity: usize) -> Result<Self, TurnstileError> {
        Self::try_with_clock(idle_ttl, queue_capacity, Arc::new(SystemClock))
    }

    /// Same as [`BitmapCache::try_new`] with an explicit time source.
    pub fn try_with_clock(
        idle_ttl: Duration,
        queue_capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TurnstileError> {
        let entries: Arc<Mutex<HashMap<P, CacheEntry>>> = Arc::new(Mutex::new(HashMap::new()));
        let (queue, feed) = bounded(queue_capacity);
        let worker = BuildWorker {
            entries: entries.clone(),
            clock: clock.clone(),
            idle_ttl,
        };
        thread::Builder::new()
            .name("turnstile-bitmap-build".to_string())
            .spawn(move || worker.run(feed))?;
        Ok(Self {
            entries,
            queue,
            clock,
            idle_ttl,
        })
    }

    /// Fetch the cached bitmap for one predicate, refreshing its idle timer.
    ///
    /// Non-blocking; an entry idle for longer than the TTL is evicted here
    /// and reported as absent.
    pub fn lookup(&self, predicate: &P) -> Option<RoaringBitmap> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        lookup_entry(&mut entries, predicate, now, self.idle_ttl)
    }

    /// Batch lookup under a single lock acquisition.
    ///
    /// Returned bitmaps are copies, so a later eviction can never invalidate
    /// a caller's partition of predicates into cached and uncached.
    pub fn lookup_many<'a>(
        &self,
        predicates: impl IntoIterator<Item = &'a P>,
    ) -> HashMap<P, RoaringBitmap> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let mut found = HashMap::new();
        for predicate in predicates {
            if let Some(bitmap) = lookup_entry(&mut entries, predicate, now, self.idle_ttl) {
                found.insert(predicate.clone(), bitmap);
            }
        }
        found
    }

    /// Queue background bitmap construction for predicates missing from the
    /// cache.
    ///
    /// Fire-and-forget: the call never blocks, and a full queue drops the
    /// batch with a warning. Builds are a cold-path optimization; no caller
    /// depends on their completion.
    pub fn schedule_build(&self, predicates: Vec<(P, Expr)>, blocks: Arc<[BlockMeta]>) {
        if predicates.is_empty() {
            return;
        }
        match self.queue.try_send(BuildBatch { predicates, blocks }) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => {
                warn!(
                    dropped = batch.predicates.len(),
                    "bitmap build queue full, dropping batch"
                );
            }
            Err(TrySendError::Disconnected(batch)) => {
                warn!(
                    dropped = batch.predicates.len(),
                    "bitmap build worker is gone, dropping batch"
                );
            }
        }
    }

    /// Number of live entries, counting expired-but-unevicted ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn lookup_entry<P: PredicateKey>(
    entries: &mut HashMap<P, CacheEntry>,
    predicate: &P,
    now: Instant,
    idle_ttl: Duration,
) -> Option<RoaringBitmap> {
    let expired = match entries.get(predicate) {
        Some(entry) => now.saturating_duration_since(entry.last_access) > idle_ttl,
        None => return None,
    };
    if expired {
        entries.remove(predicate);
        return None;
    }
    let entry = entries.get_mut(predicate)?;
    entry.last_access = now;
    Some(entry.bitmap.clone())
}

struct BuildWorker<P: PredicateKey> {
    entries: Arc<Mutex<HashMap<P, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    idle_ttl: Duration,
}

impl<P: PredicateKey> BuildWorker<P> {
    fn run(self, feed: Receiver<BuildBatch<P>>) {
        while let Ok(batch) = feed.recv() {
            for (predicate, expr) in batch.predicates {
                // Per-predicate isolation: a redundant or useless build for
                // one predicate never affects the rest of the batch.
                if self.has_live_entry(&predicate) {
                    continue;
                }
                let bitmap = build_bitmap(&expr, &batch.blocks);
                debug!(predicate = ?predicate, matching = bitmap.len(), "bitmap built");
                let mut entries = self.entries.lock();
                entries.insert(
                    predicate,
                    CacheEntry {
                        bitmap,
                        last_access: self.clock.now(),
                    },
                );
            }
        }
    }

    fn has_live_entry(&self, predicate: &P) -> bool {
        let entries = self.entries.lock();
        match entries.get(predicate) {
            Some(entry) => {
                self.clock.now().saturating_duration_since(entry.last_access) <= self.idle_ttl
            }
            None => false,
        }
    }
}

/// Scan every block once, retaining the ordinals the statistics filter
/// cannot exclude. Only complete bitmaps ever reach the cache.
fn build_bitmap(expr: &Expr, blocks: &[BlockMeta]) -> RoaringBitmap {
    let mut bitmap = RoaringBitmap::new();
    for (ordinal, block) in blocks.iter().enumerate() {
        if !filter::can_exclude(expr, block) {
            bitmap.insert(ordinal as u32);
        }
    }
    bitmap
}
