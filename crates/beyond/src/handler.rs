use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::session::{Event, Session};

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

type HandlerFn<M> = dyn for<'a> Fn(&'a mut Session<M>, Event) -> HandlerFuture<'a> + Send + Sync;

/// A server-held event callback. Handlers run on the session's own task with
/// exclusive access to the session, one at a time.
///
/// A plain handler pushes nothing by itself; wrap it with
/// [`with_rerender`](crate::rerender::with_rerender) to refresh the page
/// after it runs.
pub struct Handler<M> {
    func: Arc<HandlerFn<M>>,
    rerenders: bool,
}

impl<M: Send + 'static> Handler<M> {
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<M>, Event) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            rerenders: false,
        }
    }

    pub(crate) fn mark_rerendering(mut self) -> Self {
        self.rerenders = true;
        self
    }
}

impl<M> Handler<M> {
    pub fn call<'a>(&self, session: &'a mut Session<M>, event: Event) -> HandlerFuture<'a> {
        (self.func)(session, event)
    }

    /// Whether this handler re-renders the page once it completes.
    pub fn rerenders(&self) -> bool {
        self.rerenders
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl<M> Clone for Handler<M> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            rerenders: self.rerenders,
        }
    }
}

impl<M> fmt::Debug for Handler<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("rerenders", &self.rerenders)
            .finish_non_exhaustive()
    }
}
