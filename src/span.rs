// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::time::Duration;

use crate::context::TraceContext;
use crate::error::Error;
use crate::record::Record;
use crate::section::Section;
use crate::tracer::Tracer;

/// One live occurrence of a section, from begin to end.
///
/// A span is exclusively owned by the call path that created it; ending it
/// takes `&mut self`, so two paths racing to close the same span is
/// unrepresentable without interior sharing. The remaining misuse, ending
/// one span twice from the same path, is caught by a closed flag and
/// reported as a usage error.
///
/// Dropping an open span does not end it. A span abandoned without `end`
/// stays open in the trace, which is visible in a viewer and intentionally
/// not papered over.
#[must_use]
pub struct Span {
    pub(crate) inner: Option<SpanInner>,
}

pub(crate) struct SpanInner {
    pub(crate) tracer: Tracer,
    pub(crate) t0: i64,
    pub(crate) t1: i64,
    pub(crate) begin_record: Record,
    pub(crate) has_parent: bool,
    pub(crate) original_context: TraceContext,
    pub(crate) closed: bool,
}

impl Span {
    /// A place-holder span that never records anything.
    ///
    /// All operations on it are silent no-ops. [`Section::begin`] hands one
    /// back when carrier extraction fails under a non-panicking policy.
    #[inline]
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Close the span reporting success.
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
    ///
    /// let (_, mut span) = tracer.section("flush").begin(&TraceContext::new());
    /// span.end();
    ///
    /// assert_eq!(records.lock().len(), 2);
    /// ```
    pub fn end(&mut self) {
        self.do_end(true);
    }

    /// Close the span reporting the outcome of `result`.
    ///
    /// The error itself is not recorded, only whether there was one; a
    /// failing unit of work is data for the trace, never a tracer failure.
    pub fn end_with<T, E>(&mut self, result: &Result<T, E>) {
        self.do_end(result.is_ok());
    }

    fn do_end(&mut self, succeeded: bool) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        if inner.closed {
            inner.tracer.usage_error(Error::EndedTwice {
                name: inner.begin_record.name.to_string(),
            });
            return;
        }
        inner.closed = true;

        let t2 = inner.tracer.now_micros();
        let end_record = Record::end_from(&inner.begin_record, t2, succeeded);
        inner
            .tracer
            .collect()
            .on_end(&inner.begin_record, &end_record);

        // Hook time deliberately lands in overhead, not internal: t1 was
        // taken after the begin hook returned, t3 after the end hook.
        let internal = t2 - inner.t1;
        let t3 = inner.tracer.now_micros();
        let overhead = (t3 - inner.t0) - internal;
        inner.tracer.collect().on_timing(
            Duration::from_micros(overhead.max(0) as u64),
            Duration::from_micros(internal.max(0) as u64),
            inner.has_parent,
        );
    }

    /// Close this span (reporting success) and immediately begin `next`
    /// against the carrier this span originally received, so the new span
    /// is a sibling of this one: same parent, same ancestor, not a child.
    ///
    /// A phase always closes successfully. A failing phase must instead be
    /// closed with [`end_with`], and no further phase begun after it.
    ///
    /// On a noop span this stays a no-op and returns another noop span.
    ///
    /// [`end_with`]: Span::end_with
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
    /// let fetch = tracer.section("fetch");
    /// let decode = tracer.section("decode");
    ///
    /// let (_, mut span) = fetch.begin(&TraceContext::new());
    /// let (cx, mut span) = span.next_phase(&decode);
    /// // ... decode with `cx` ...
    /// span.end();
    ///
    /// assert_eq!(records.lock().len(), 4);
    /// ```
    #[must_use]
    pub fn next_phase(&mut self, next: &Section) -> (TraceContext, Span) {
        let original = match self.inner.as_ref() {
            Some(inner) => inner.original_context.clone(),
            None => return (TraceContext::new(), Span::noop()),
        };
        self.end();
        next.begin(&original)
    }

    /// The begin record of this span, or `None` for a noop span.
    pub fn begin_record(&self) -> Option<&Record> {
        self.inner.as_ref().map(|inner| &inner.begin_record)
    }
}
