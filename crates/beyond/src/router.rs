use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::{BeyondError, Result};
use crate::handler::HandlerFuture;
use crate::node::{h, Node};
use crate::session::{Event, EventKind, Session};

type InitFn<M> =
    dyn for<'a> Fn(&'a mut Session<M>, Params, Event) -> HandlerFuture<'a> + Send + Sync;
type RenderFn<M> = dyn Fn(&Params, &M, &Event) -> Node<M> + Send + Sync;
type NotFoundFn<M> = dyn Fn(&Event) -> Node<M> + Send + Sync;

/// Capture groups of the matching route, in pattern order. Groups that did
/// not participate in the match are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Option<String>>);

impl Params {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|group| group.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct Route<M> {
    pattern: String,
    regex: Regex,
    init: Arc<InitFn<M>>,
    render: Arc<RenderFn<M>>,
}

impl<M> Route<M> {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn captures(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        Some(Params(
            captures
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        ))
    }
}

/// Ordered list of routes; the first pattern matching a path wins. Routes
/// are registered at startup and never removed.
pub struct Router<M> {
    routes: Vec<Route<M>>,
    not_found: Arc<NotFoundFn<M>>,
}

impl<M: Send + 'static> Default for Router<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Send + 'static> Router<M> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: Arc::new(|_event: &Event| not_found_view::<M>()),
        }
    }

    /// Registers a route. `pattern` is a regular expression anchored at the
    /// start of the path; add `$` to anchor the end as well.
    ///
    /// `init` runs only for `init` events, before `render`. `render` builds
    /// the page for every event on the path.
    pub fn add_route<I, R>(&mut self, pattern: &str, init: I, render: R) -> Result<&mut Self>
    where
        I: for<'a> Fn(&'a mut Session<M>, Params, Event) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
        R: Fn(&Params, &M, &Event) -> Node<M> + Send + Sync + 'static,
    {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            BeyondError::InvalidRoute {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        self.routes.push(Route {
            pattern: pattern.to_string(),
            regex,
            init: Arc::new(init),
            render: Arc::new(render),
        });
        Ok(self)
    }

    /// Replaces the page rendered for paths no route matches.
    pub fn set_not_found<F>(&mut self, render: F) -> &mut Self
    where
        F: Fn(&Event) -> Node<M> + Send + Sync + 'static,
    {
        self.not_found = Arc::new(render);
        self
    }

    pub fn routes(&self) -> &[Route<M>] {
        &self.routes
    }

    pub fn find(&self, path: &str) -> Option<(&Route<M>, Params)> {
        self.routes
            .iter()
            .find_map(|route| route.captures(path).map(|params| (route, params)))
    }

    /// Runs the matching route for `event`: its init handler first when the
    /// event is an `init`, then its render.
    pub async fn resolve(&self, session: &mut Session<M>, event: &Event) -> Result<Node<M>> {
        debug!(path = %event.path, kind = event.kind.as_str(), "rendering path");
        let Some((route, params)) = self.find(&event.path) else {
            debug!(path = %event.path, "no route found");
            return Ok((self.not_found)(event));
        };
        if event.kind == EventKind::Init {
            (route.init)(session, params.clone(), event.clone()).await?;
        }
        Ok((route.render)(&params, session.model(), event))
    }
}

pub fn not_found_view<M>() -> Node<M> {
    h("h1").child("No route found")
}
