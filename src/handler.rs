// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use crate::context::TraceContext;
use crate::section::Section;

/// Wrap a request handler so every invocation runs inside a span of
/// `section`.
///
/// The span begins before the handler, the handler runs with the derived
/// carrier, and the span ends when the handler returns. The end always
/// reports success: whatever the handler's response means to the caller is
/// its own business, a handled request is not a failed span.
///
/// # Examples
///
/// ```
/// use sectrace::wrap_handler;
/// use sectrace::Config;
/// use sectrace::TestCollector;
/// use sectrace::TraceContext;
/// use sectrace::Tracer;
///
/// let (collector, records) = TestCollector::new();
/// let tracer = Tracer::new(collector, Config::default());
///
/// let handle = wrap_handler(tracer.section("http.get"), |_cx, path: &str| {
///     format!("serving {path}")
/// });
///
/// let resp = handle(&TraceContext::new(), "/health");
/// assert_eq!(resp, "serving /health");
/// assert_eq!(records.lock().len(), 2);
/// ```
pub fn wrap_handler<Req, Resp, H>(
    section: Section,
    handler: H,
) -> impl Fn(&TraceContext, Req) -> Resp
where
    H: Fn(&TraceContext, Req) -> Resp,
{
    move |cx, req| {
        let (cx, mut span) = section.begin(cx);
        let resp = handler(&cx, req);
        span.end();
        resp
    }
}
