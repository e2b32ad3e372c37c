use std::time::Duration;

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(4 * 60 * 60);
const DEFAULT_BUILD_QUEUE_CAPACITY: usize = 64;

/// Options controlling a splitter's cache behavior
#[derive(Clone, Debug)]
pub struct SplitterOptions {
    idle_ttl: Duration,
    build_queue_capacity: usize,
}

impl SplitterOptions {
    /// Create a new builder for SplitterOptions
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    ///
    /// use turnstile::SplitterOptions;
    ///
    /// let options = SplitterOptions::builder()
    ///     .idle_ttl(Duration::from_secs(600))
    ///     .build_queue_capacity(8)
    ///     .build();
    /// ```
    pub fn builder() -> SplitterOptionsBuilder {
        SplitterOptionsBuilder::default()
    }

    /// How long a cached bitmap survives without being looked up
    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Maximum number of pending background build batches
    pub fn build_queue_capacity(&self) -> usize {
        self.build_queue_capacity
    }
}

impl Default for SplitterOptions {
    fn default() -> Self {
        Self {
            idle_ttl: DEFAULT_IDLE_TTL,
            build_queue_capacity: DEFAULT_BUILD_QUEUE_CAPACITY,
        }
    }
}

/// Builder for SplitterOptions
#[derive(Clone, Debug, Default)]
pub struct SplitterOptionsBuilder {
    idle_ttl: Option<Duration>,
    build_queue_capacity: Option<usize>,
}

impl SplitterOptionsBuilder {
    /// Set the idle expiry window for cached bitmaps (default: 4 hours)
    ///
    /// Expiry is per entry and independent of cache size; an entry unused
    /// for the whole window is evicted lazily on its next access.
    pub fn idle_ttl(mut self, value: Duration) -> Self {
        self.idle_ttl = Some(value);
        self
    }

    /// Set the build queue bound (default: 64 batches)
    ///
    /// When the queue is full, further build requests are dropped with a
    /// warning rather than blocking the planning path.
    pub fn build_queue_capacity(mut self, value: usize) -> Self {
        self.build_queue_capacity = Some(value);
        self
    }

    /// Build the SplitterOptions
    pub fn build(self) -> SplitterOptions {
        SplitterOptions {
            idle_ttl: self.idle_ttl.unwrap_or(DEFAULT_IDLE_TTL),
            build_queue_capacity: self
                .build_queue_capacity
                .unwrap_or(DEFAULT_BUILD_QUEUE_CAPACITY),
        }
    }
}
