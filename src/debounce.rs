use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

type Handler<T> = Box<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Leading-edge debouncer with a coalesced trailing call.
///
/// The first call of a burst runs the handler at once. Calls arriving while
/// the quiet window is open replace each other and push the window back;
/// when it closes, the handler runs once more with the latest argument.
/// Handler runs are spawned onto the tokio runtime and may overlap.
pub struct Debouncer<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    wait: Duration,
    handler: Handler<T>,
    state: Mutex<State<T>>,
}

struct State<T> {
    deadline: Option<Instant>,
    pending: Option<T>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(wait: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                wait,
                handler: Box::new(move |args| Box::pin(handler(args))),
                state: Mutex::new(State {
                    deadline: None,
                    pending: None,
                }),
            }),
        }
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    /// Must be called from within a tokio runtime.
    pub fn call(&self, args: T) {
        let mut state = self.inner.lock();
        let deadline = Instant::now() + self.inner.wait;

        if state.deadline.is_some() {
            trace!("Coalescing call into pending trailing run");
            state.pending = Some(args);
            state.deadline = Some(deadline);
            return;
        }

        state.deadline = Some(deadline);
        drop(state);

        tokio::spawn((self.inner.handler)(args));
        tokio::spawn(Arc::clone(&self.inner).run_timer());
    }

    /// Whether a trailing run is queued.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }
}

impl<T: Send + 'static> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_timer(self: Arc<Self>) {
        loop {
            let Some(deadline) = self.lock().deadline else {
                return;
            };
            sleep_until(deadline).await;

            let pending = {
                let mut state = self.lock();
                match state.deadline {
                    Some(current) if current > Instant::now() => continue,
                    _ => {}
                }
                state.deadline = None;
                state.pending.take()
            };

            if let Some(args) = pending {
                trace!("Firing trailing debounced call");
                tokio::spawn((self.handler)(args));
            }
            return;
        }
    }
}
