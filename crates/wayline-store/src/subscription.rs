//! Subscription handles
//!
//! Returned by every `subscribe`/`listen` call in the workspace. Dropping the
//! handle (or calling [`Subscription::unsubscribe`]) removes the listener.

type Teardown = Box<dyn FnOnce() + Send>;

#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    teardown: Option<Teardown>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.run();
    }

    /// Keep the listener registered for the lifetime of its source
    pub fn detach(mut self) {
        self.teardown = None;
    }

    fn run(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}
