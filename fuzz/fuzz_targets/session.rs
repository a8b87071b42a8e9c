#![no_main]

use std::sync::Arc;

use beyond::{h, interactive, Event, HandlerFuture, Node, Params, Router, Session};
use libfuzzer_sys::fuzz_target;
use tokio::sync::mpsc;

fn init(session: &mut Session<u32>, _params: Params, _event: Event) -> HandlerFuture<'_> {
    Box::pin(async move {
        *session.model_mut() = 0;
        Ok(())
    })
}

fn bump(session: &mut Session<u32>, _event: Event) -> HandlerFuture<'_> {
    Box::pin(async move {
        *session.model_mut() += 1;
        Ok(())
    })
}

fn render(_params: &Params, model: &u32, _event: &Event) -> Node<u32> {
    h("div")
        .child(*model)
        .child(h("button").on("click", interactive(bump)))
}

// Each line of input is one text frame; errors are expected, panics are not.
fuzz_target!(|data: &[u8]| {
    if data.len() > 32 * 1024 {
        return;
    }
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };
    let text = String::from_utf8_lossy(data);
    runtime.block_on(async {
        let mut router = Router::new();
        if router.add_route(r"/$", init, render).is_err() {
            return;
        }
        let (tx, mut rx) = mpsc::channel(1024);
        let mut session = Session::new(0, Arc::new(router), 0u32, tx);
        for line in text.lines() {
            if session.handle_text(line).await.is_err() {
                break;
            }
            while rx.try_recv().is_ok() {}
        }
    });
});
