// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::record::Record;

/// The sink a [`Tracer`] feeds from inside the span lifecycle.
///
/// Every method runs synchronously on the caller's stack, between the
/// timestamp reads of `begin` and `end`. Implementations decide what a
/// record costs: push to a buffer, print, drop. Heavy work here lands in
/// the overhead figure reported to [`on_timing`], not in the span itself.
///
/// [`Tracer`]: crate::Tracer
/// [`on_timing`]: Collect::on_timing
#[cfg_attr(test, mockall::automock)]
pub trait Collect: Send + Sync + 'static {
    /// A span opened. The begin record is complete, args included.
    fn on_begin(&self, record: &Record);

    /// A span closed. `end` repeats the begin args plus the outcome flag.
    fn on_end(&self, begin: &Record, end: &Record);

    /// Accounting for a closed span: `internal` is the wall time between
    /// the end of `begin` and the start of `end`, `overhead` is everything
    /// the instrumentation added around it.
    fn on_timing(&self, overhead: Duration, internal: Duration, has_parent: bool) {
        let _ = (overhead, internal, has_parent);
    }

    /// A node id is about to be drawn.
    fn on_node_id(&self) {}
}

impl<C: Collect + ?Sized> Collect for Arc<C> {
    fn on_begin(&self, record: &Record) {
        (**self).on_begin(record)
    }

    fn on_end(&self, begin: &Record, end: &Record) {
        (**self).on_end(begin, end)
    }

    fn on_timing(&self, overhead: Duration, internal: Duration, has_parent: bool) {
        (**self).on_timing(overhead, internal, has_parent)
    }

    fn on_node_id(&self) {
        (**self).on_node_id()
    }
}

/// A collector that prints every record to stderr.
pub struct ConsoleCollector;

impl Collect for ConsoleCollector {
    fn on_begin(&self, record: &Record) {
        eprintln!("{:#?}", record);
    }

    fn on_end(&self, _begin: &Record, end: &Record) {
        eprintln!("{:#?}", end);
    }
}

/// A collector that accumulates records in memory, in emission order.
///
/// `new` hands back the collector together with a shared handle to the
/// record buffer, so the tracer can own one end while the test or exporter
/// drains the other.
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
/// let (_, mut span) = tracer.section("work").begin(&TraceContext::new());
/// span.end();
///
/// let summary = tracer.export(records.lock().clone());
/// assert_eq!(summary.trace_events.len(), 2);
/// ```
pub struct TestCollector {
    pub records: Arc<Mutex<Vec<Record>>>,
}

impl TestCollector {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, Arc<Mutex<Vec<Record>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl Collect for TestCollector {
    fn on_begin(&self, record: &Record) {
        self.records.lock().push(record.clone());
    }

    fn on_end(&self, _begin: &Record, end: &Record) {
        self.records.lock().push(end.clone());
    }
}
