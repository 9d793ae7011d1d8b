//! Path routing over a multi-rooted tree of segments. Literal segments
//! match byte-for-byte; `{param}` segments match any one segment and
//! `{param:regex}` segments match their compiled pattern. Literal siblings
//! sit in front of parameterized ones, so they always win a tie.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;

pub type HandlerFuture = BoxFuture<'static, Result<Response>>;
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

struct PathSegment {
    /// Literal text, or the regex source for parameterized segments.
    name: String,
    /// Parameter name for `{param}`-style segments.
    param: Option<String>,
    /// Compiled only for explicit-regex segments; a bare `{param}`
    /// carries the implicit `[^/]+`.
    pattern: Option<Regex>,
    children: Vec<PathSegment>,
    handler: Option<Handler>,
}

const IMPLICIT_PATTERN: &str = "[^/]+";

impl PathSegment {
    /// Parses one registered path element: a literal, `{param}`, or
    /// `{param : regex}`. Regex problems surface at registration time.
    fn parse(text: &str) -> Result<PathSegment> {
        let mut segment = PathSegment {
            name: text.to_string(),
            param: None,
            pattern: None,
            children: Vec::new(),
            handler: None,
        };

        let inner = match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            Some(inner) => inner,
            None => return Ok(segment),
        };

        let (param, source) = match inner.split_once(':') {
            Some((param, source)) => (param.trim(), source.trim()),
            None => (inner.trim(), ""),
        };

        if param.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "no parameter name specified in {text}"
            )));
        }
        segment.param = Some(param.to_string());

        if source.is_empty() {
            segment.name = IMPLICIT_PATTERN.to_string();
        } else {
            segment.name = source.to_string();
            let compiled = RegexBuilder::new(&format!("^(?:{source})$"))
                .case_insensitive(true)
                .build()
                .map_err(|err| {
                    Error::InvalidArgument(format!("invalid regular expression: {err}"))
                })?;
            segment.pattern = Some(compiled);
        }

        Ok(segment)
    }

    fn is_param(&self) -> bool {
        self.param.is_some()
    }

    fn matches(&self, segment: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(segment),
            None if self.is_param() => true,
            None => self.name == segment,
        }
    }
}

/// Splits a path on `/`, dropping empty elements.
fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Routes requests to registered handlers. Registration takes the write
/// lock; dispatch walks a read snapshot and is otherwise lock-free.
#[derive(Default)]
pub struct Router {
    roots: RwLock<Vec<PathSegment>>,
}

impl Router {
    pub fn new() -> Router {
        Router::default()
    }

    /// Registers `handler` for `path`. Existing nodes are reused when the
    /// segment spelling matches; new literal nodes go to the front of
    /// their sibling list and parameterized nodes to the back.
    pub fn add<F>(&self, path: &str, handler: F) -> Result<()>
    where
        F: Fn(Request) -> HandlerFuture + Send + Sync + 'static,
    {
        let elements = split(path);
        if elements.is_empty() {
            return Err(Error::InvalidArgument(format!("empty route path ({path})")));
        }

        let mut roots = self.roots.write().unwrap();
        let terminal = insert(&mut roots, &elements)?;
        terminal.handler = Some(Arc::new(handler));

        debug!(path, "route registered");
        Ok(())
    }

    /// Dispatches a request: walks the tree level by level, first sibling
    /// whose matcher accepts the segment wins, parameter captures land on
    /// the request. A dead end is 404; a terminal node without a handler
    /// is 501.
    pub async fn handle(&self, mut req: Request) -> Result<Response> {
        let segments = split(req.uri().path().get());

        let handler = {
            let roots = self.roots.read().unwrap();

            let mut level = &*roots;
            let mut terminal: Option<&PathSegment> = None;

            for segment in &segments {
                let node = level
                    .iter()
                    .find(|node| node.matches(segment))
                    .ok_or_else(|| {
                        Error::NotFound(format!("resource ({}) is not found", req.uri()))
                    })?;

                if let Some(param) = &node.param {
                    req.set_path_param(param.clone(), segment.clone());
                }

                level = &node.children;
                terminal = Some(node);
            }

            let terminal = terminal.ok_or_else(|| {
                Error::NotFound(format!("resource ({}) is not found", req.uri()))
            })?;

            terminal.handler.clone().ok_or_else(|| {
                Error::NotImplemented(format!(
                    "{} is not implemented for resource ({})",
                    req.method(),
                    req.uri()
                ))
            })?
        };

        handler(req).await
    }
}

fn insert<'a>(
    level: &'a mut Vec<PathSegment>,
    elements: &[String],
) -> Result<&'a mut PathSegment> {
    let (first, rest) = elements.split_first().expect("non-empty elements");
    let parsed = PathSegment::parse(first)?;

    let idx = match level.iter().position(|node| node.name == parsed.name) {
        Some(idx) => idx,
        None if parsed.is_param() => {
            level.push(parsed);
            level.len() - 1
        }
        None => {
            level.insert(0, parsed);
            0
        }
    };

    let node = &mut level[idx];
    if rest.is_empty() {
        Ok(node)
    } else {
        insert(&mut node.children, rest)
    }
}
