/// Settings for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatcherOptions {
    name: String,
    queue_depth: usize,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            name: String::from("callback-bridge"),
            queue_depth: 0,
        }
    }
}

impl DispatcherOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name used to identify the dispatcher in logs.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Sets how many calls may wait in the channel beyond the one slot each blocked producer
    /// holds.
    ///
    /// With the default of `0` a producer returns from [`submit()`](crate::Dispatcher::submit)
    /// once its call is queued, and the next `submit` from the same producer blocks until the
    /// consumer has taken that call.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }
}
