use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback = Box<dyn Fn(&str) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct NotifierState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Fan-out point for "asset finished loading" notifications coming off the
/// loader thread. Subscribers hold a guard; dropping it removes the callback.
#[derive(Clone, Default)]
pub struct ResourceNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl ResourceNotifier {
    pub fn new() -> Self {
        ResourceNotifier::default()
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> ResourceSubscription {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        ResourceSubscription {
            id,
            state: Arc::downgrade(&self.state),
        }
    }

    pub fn notify_ready(&self, path: &str) {
        let state = self.state.lock();
        for subscriber in &state.subscribers {
            (subscriber.callback)(path);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

#[must_use = "dropping the subscription immediately unsubscribes"]
pub struct ResourceSubscription {
    id: u64,
    state: Weak<Mutex<NotifierState>>,
}

impl Drop for ResourceSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().subscribers.retain(|s| s.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::ResourceNotifier;

    #[test]
    fn notify_reaches_every_subscriber() {
        let notifier = ResourceNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&hits);
        let _a = notifier.subscribe(move |path| {
            if path == "anim/turtle.res" {
                first.fetch_add(1, Ordering::SeqCst);
            }
        });
        let second = Arc::clone(&hits);
        let _b = notifier.subscribe(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify_ready("anim/turtle.res");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let notifier = ResourceNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let subscription = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifier.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.notify_ready("anything");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notifications_arrive_from_other_threads() {
        let notifier = ResourceNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _subscription = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let loader = notifier.clone();
        let worker = thread::spawn(move || {
            loader.notify_ready("tileset/night.res");
        });
        worker.join().expect("loader thread panicked");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
