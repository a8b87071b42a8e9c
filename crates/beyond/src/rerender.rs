use crate::handler::{Handler, HandlerFuture};
use crate::session::{Event, Session};

/// Composes `handler` with the render pipeline: run the handler, then render
/// the event's path, serialize, replace the session's event table and push
/// the update. If the handler fails nothing is rendered or pushed and the
/// error is returned to the dispatch loop.
pub fn with_rerender<M: Send + 'static>(handler: Handler<M>) -> Handler<M> {
    Handler::<M>::new(move |session: &mut Session<M>, event: Event| {
        let handler = handler.clone();
        Box::pin(async move {
            handler.call(session, event.clone()).await?;
            session.render(&event).await
        })
    })
    .mark_rerendering()
}

/// Shorthand for `with_rerender(Handler::new(func))`.
pub fn interactive<M, F>(func: F) -> Handler<M>
where
    M: Send + 'static,
    F: for<'a> Fn(&'a mut Session<M>, Event) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    with_rerender(Handler::new(func))
}
