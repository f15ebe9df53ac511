// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

//! A hierarchical section tracing library with Chrome trace-event export.
//!
//! Application code wraps logical units of work, called sections, so that
//! their timing, nesting, and causal relationships are recorded as begin
//! and end events. The collected events export as trace-event JSON that
//! loads directly into chrome://tracing or Perfetto.
//!
//! ## Sections and spans
//!
//!   A [`Section`] is a reusable named descriptor for a kind of operation.
//!   Each time the operation runs, the section opens a [`Span`]: one
//!   occurrence with its own node id, begin record, and end record.
//!   [`Section::run`] wraps a closure in a span and records whether it
//!   returned `Ok`:
//!
//!   ```
//!   use sectrace::prelude::*;
//!
//!   let (collector, records) = TestCollector::new();
//!   let tracer = Tracer::new(collector, Config::default().scope("demo"));
//!
//!   let load = tracer.section("load");
//!   let parse = load.subsection("parse");
//!
//!   let result: Result<u32, &str> = load.run(&TraceContext::new(), |cx| {
//!       // Runs as a child of "load".
//!       parse.run(cx, |_cx| Ok(7))
//!   });
//!   assert_eq!(result, Ok(7));
//!
//!   let summary = tracer.export(records.lock().clone());
//!   println!("{}", serde_json::to_string_pretty(&summary).unwrap());
//!   ```
//!
//! ## Carrying context
//!
//!   Lineage travels through an immutable [`TraceContext`] carrier.
//!   Beginning a span derives a child carrier under which the new span is
//!   the parent; a span begun against an empty carrier becomes a root and
//!   its id becomes the ancestor of everything opened beneath it. Carriers
//!   are plain values, so one parent can fan out to any number of threads:
//!
//!   ```
//!   use sectrace::prelude::*;
//!
//!   let (collector, records) = TestCollector::new();
//!   let tracer = Tracer::new(collector, Config::default());
//!
//!   let (cx, mut root) = tracer.section("root").begin(&TraceContext::new());
//!
//!   crossbeam::scope(|scope| {
//!       for _ in 0..4 {
//!           let worker = tracer.section("worker");
//!           let cx = cx.clone();
//!           scope.spawn(move |_| {
//!               let _: Result<(), ()> = worker.run(&cx, |_cx| Ok(()));
//!           });
//!       }
//!   })
//!   .unwrap();
//!
//!   root.end();
//!   assert_eq!(records.lock().len(), 10);
//!   ```
//!
//!   Across process boundaries the linkage travels as [`RemoteInfo`], a
//!   serde value the transport is free to ship however it likes; the
//!   receiving side attaches it with [`TraceContext::with_remote`].
//!
//! ## Phases
//!
//!   Sequential stages of one logical operation can succeed each other as
//!   siblings: [`Span::next_phase`] ends the current span and begins the
//!   next section against the carrier the current span originally
//!   received, so all phases share the same parent and ancestor.
//!
//!   ```
//!   use sectrace::prelude::*;
//!
//!   let (collector, records) = TestCollector::new();
//!   let tracer = Tracer::new(collector, Config::default());
//!
//!   let (_, mut span) = tracer.section("fetch").begin(&TraceContext::new());
//!   let (_, mut span) = span.next_phase(&tracer.section("decode"));
//!   let (_, mut span) = span.next_phase(&tracer.section("write"));
//!   span.end();
//!
//!   assert_eq!(records.lock().len(), 6);
//!   ```
//!
//! ## Collectors
//!
//!   Records reach the embedding application through the [`Collect`]
//!   trait, invoked synchronously at each lifecycle step. The bundled
//!   [`TestCollector`] accumulates records in memory and
//!   [`ConsoleCollector`] prints them; an exporter is a collector that
//!   feeds [`Tracer::export`] once recording is done.
//!
//! ## Usage errors
//!
//!   Ending a span twice, reusing a section name in strict mode, and
//!   partial remote linkage are instrumentation bugs, reported through the
//!   [`ErrorPolicy`] chosen at construction. The default policy panics;
//!   production binaries that prefer best-effort tracing install
//!   [`ErrorPolicy::Log`] or a custom callback:
//!
//!   ```
//!   use std::sync::Arc;
//!
//!   use parking_lot::Mutex;
//!   use sectrace::prelude::*;
//!
//!   let seen = Arc::new(Mutex::new(Vec::new()));
//!   let sink = seen.clone();
//!
//!   let (collector, _records) = TestCollector::new();
//!   let tracer = Tracer::new(
//!       collector,
//!       Config::default().error_policy(ErrorPolicy::Custom(Arc::new(move |err| {
//!           sink.lock().push(err.clone());
//!       }))),
//!   );
//!
//!   let (_, mut span) = tracer.section("once").begin(&TraceContext::new());
//!   span.end();
//!   span.end();
//!
//!   assert_eq!(seen.lock().len(), 1);
//!   ```

pub mod clock;
pub mod collect;
pub mod context;
pub mod error;
pub mod handler;
pub mod id;
pub mod record;
pub mod section;
pub mod span;
pub mod tracer;

pub use crate::clock::Clock;
pub use crate::clock::SystemClock;
pub use crate::clock::TestClock;
pub use crate::collect::Collect;
pub use crate::collect::ConsoleCollector;
pub use crate::collect::TestCollector;
pub use crate::context::NodeAndScope;
pub use crate::context::RemoteInfo;
pub use crate::context::TraceContext;
pub use crate::error::Error;
pub use crate::error::ErrorPolicy;
pub use crate::handler::wrap_handler;
pub use crate::id::NodeId;
pub use crate::record::Args;
pub use crate::record::Phase;
pub use crate::record::Record;
pub use crate::record::Summary;
pub use crate::section::Section;
pub use crate::span::Span;
pub use crate::tracer::Config;
pub use crate::tracer::Tracer;

pub mod prelude {
    //! A "prelude" for crates using the `sectrace` crate.

    pub use crate::collect::Collect;
    pub use crate::collect::ConsoleCollector;
    pub use crate::collect::TestCollector;
    pub use crate::context::RemoteInfo;
    pub use crate::context::TraceContext;
    pub use crate::error::ErrorPolicy;
    pub use crate::handler::wrap_handler;
    pub use crate::id::NodeId;
    pub use crate::record::Record;
    pub use crate::record::Summary;
    pub use crate::section::Section;
    pub use crate::span::Span;
    pub use crate::tracer::Config;
    pub use crate::tracer::Tracer;
}
