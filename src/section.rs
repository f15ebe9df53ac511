// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::borrow::Cow;

use crate::context::TraceContext;
use crate::record::Phase;
use crate::span::Span;
use crate::span::SpanInner;
use crate::tracer::Tracer;

/// A reusable, named descriptor for a kind of traced operation.
///
/// A `Section` carries no per-occurrence state. Create one per operation
/// kind, then [`begin`] or [`run`] it as often as the operation executes;
/// every occurrence gets its own [`Span`] and node id.
///
/// [`begin`]: Section::begin
/// [`run`]: Section::run
#[derive(Clone)]
pub struct Section {
    name: Cow<'static, str>,
    tracer: Tracer,
}

impl Section {
    pub(crate) fn new(tracer: Tracer, name: Cow<'static, str>) -> Self {
        Self { name, tracer }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A descriptor named `"{self}.{name}"`, registered on the same tracer.
    ///
    /// Pure name composition; the dotted name is the only relationship the
    /// two descriptors have.
    pub fn subsection(&self, name: impl Into<Cow<'static, str>>) -> Section {
        self.tracer.section(format!("{}.{}", self.name, name.into()))
    }

    /// Open a span of this section against the carrier `cx`.
    ///
    /// Draws a fresh node id, emits the begin record, and returns the
    /// derived carrier (under which this span is the parent) together with
    /// the live span. Whether the span is a root is decided by `cx`: no
    /// parent key means this span becomes its own ancestor.
    ///
    /// If `cx` carries partial remote linkage the error is routed through
    /// the tracer's policy and, should the policy return, a noop span comes
    /// back along with the unchanged carrier. Callers must not treat that
    /// as an open span.
    #[must_use]
    pub fn begin(&self, cx: &TraceContext) -> (TraceContext, Span) {
        let t0 = self.tracer.now_micros();
        let id = self.tracer.next_node_id();
        let mut record = self
            .tracer
            .make_record(self.name.clone(), id, Phase::Begin, t0);

        record.args = match cx.to_args() {
            Ok(args) => args,
            Err(err) => {
                self.tracer.usage_error(err);
                return (cx.clone(), Span::noop());
            }
        };

        let has_parent = record.args.parent.is_some();
        let child = cx.with_local(id, !has_parent);

        self.tracer.collect().on_begin(&record);
        let t1 = self.tracer.now_micros();

        let span = Span {
            inner: Some(SpanInner {
                tracer: self.tracer.clone(),
                t0,
                t1,
                begin_record: record,
                has_parent,
                original_context: cx.clone(),
                closed: false,
            }),
        };

        (child, span)
    }

    /// Run `work` inside a span of this section.
    ///
    /// Begins, hands `work` the derived carrier, ends with the outcome of
    /// `work`, and returns that outcome untouched. If the begin failed, the
    /// work still runs (against an unchanged carrier) and no records are
    /// emitted; tracing is best-effort once the error policy has let the
    /// failure pass.
    ///
    /// # Examples
    ///
    /// ```
    /// use sectrace::Config;
    /// use sectrace::TestCollector;
    /// use sectrace::TraceContext;
    /// use sectrace::Tracer;
    ///
    /// let (collector, records) = TestCollector::new();
    /// let tracer = Tracer::new(collector, Config::default());
    /// let section = tracer.section("compress");
    ///
    /// let result: Result<usize, &str> =
    ///     section.run(&TraceContext::new(), |_cx| Ok(42));
    ///
    /// assert_eq!(result, Ok(42));
    /// assert_eq!(records.lock().len(), 2);
    /// ```
    pub fn run<T, E, F>(&self, cx: &TraceContext, work: F) -> Result<T, E>
    where
        F: FnOnce(&TraceContext) -> Result<T, E>,
    {
        let (cx, mut span) = self.begin(cx);
        let result = work(&cx);
        span.end_with(&result);
        result
    }
}
