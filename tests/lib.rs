// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sectrace::Error;
use sectrace::NodeAndScope;
use sectrace::Phase;
use sectrace::TestClock;
use sectrace::prelude::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

fn frozen_clock() -> Arc<TestClock> {
    Arc::new(TestClock::new(1_230_000_000))
}

fn scenario_config() -> Config {
    let mut other_data = Map::new();
    other_data.insert("test".to_string(), json!("yes"));
    Config::default()
        .scope("testscope")
        .process_id(123)
        .other_data(other_data)
}

fn exported(tracer: &Tracer, records: &Arc<Mutex<Vec<Record>>>) -> Value {
    serde_json::to_value(tracer.export(records.lock().clone())).unwrap()
}

#[test]
fn run_traces_nested_work() {
    let clock = frozen_clock();
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::with_clock(collector, scenario_config(), Arc::clone(&clock));

    let section1 = tracer.section("section1");
    let section2 = tracer.section("section2");
    let section3 = tracer.section("section3");

    let _ = section1.run(&TraceContext::new(), |cx| {
        clock.advance(Duration::from_secs(1));
        let _ = section2.run(cx, |cx| {
            clock.advance(Duration::from_secs(3));
            let _ = section3.run(cx, |_| {
                clock.advance(Duration::from_secs(10));
                Ok::<_, &str>(())
            });
            clock.advance(Duration::from_secs(4));
            Err::<(), _>("oops")
        });
        clock.advance(Duration::from_secs(2));
        let _ = section2.run(cx, |_| {
            clock.advance(Duration::from_secs(5));
            Ok::<_, &str>(())
        });
        clock.advance(Duration::from_secs(4));
        Ok::<_, &str>(())
    });

    assert_eq!(
        exported(&tracer, &records),
        json!({
            "traceEvents": [
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "section1", "ph": "b", "ts": 1230000000},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section2", "ph": "b", "ts": 1231000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section3", "ph": "b", "ts": 1234000000,
                 "args": {"p": 2, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section3", "ph": "e", "ts": 1244000000,
                 "args": {"p": 2, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section2", "ph": "e", "ts": 1248000000,
                 "args": {"p": 1, "a": 1, "succeeded": false}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2", "ph": "b", "ts": 1250000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2", "ph": "e", "ts": 1255000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "section1", "ph": "e", "ts": 1259000000,
                 "args": {"succeeded": true}},
            ],
            "displayTimeUnit": "ms",
            "otherData": {"test": "yes"}
        })
    );
}

#[test]
fn begin_and_end_trace_by_hand() {
    let clock = frozen_clock();
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::with_clock(collector, scenario_config(), Arc::clone(&clock));

    let section1 = tracer.section("section1");
    let section2 = tracer.section("section2");

    let (cx, mut outer) = section1.begin(&TraceContext::new());
    clock.advance(Duration::from_secs(1));

    let (_, mut inner) = section2.begin(&cx);
    clock.advance(Duration::from_secs(1));
    inner.end();

    clock.advance(Duration::from_secs(1));
    outer.end();

    assert_eq!(
        exported(&tracer, &records),
        json!({
            "traceEvents": [
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "section1", "ph": "b", "ts": 1230000000},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section2", "ph": "b", "ts": 1231000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section2", "ph": "e", "ts": 1232000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "section1", "ph": "e", "ts": 1233000000,
                 "args": {"succeeded": true}},
            ],
            "displayTimeUnit": "ms",
            "otherData": {"test": "yes"}
        })
    );
}

#[test]
fn next_phase_chains_the_phases_of_one_operation() {
    let clock = frozen_clock();
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::with_clock(collector, scenario_config(), Arc::clone(&clock));

    let container = tracer.section("container");
    let section1 = tracer.section("section1");
    let section2 = tracer.section("section2");
    let section21 = tracer.section("section2.1");
    let section3 = tracer.section("section3");

    let (cx, mut container_span) = container.begin(&TraceContext::new());
    clock.advance(Duration::from_secs(1));

    let (_, mut span) = section1.begin(&cx);
    clock.advance(Duration::from_secs(2));

    let (phase_cx, mut span) = span.next_phase(&section2);
    let _ = section21.run(&phase_cx, |_| {
        clock.advance(Duration::from_secs(3));
        Ok::<_, &str>(())
    });
    let (_, mut span) = span.next_phase(&section3);
    clock.advance(Duration::from_secs(4));
    span.end();

    clock.advance(Duration::from_secs(5));
    container_span.end();

    assert_eq!(
        exported(&tracer, &records),
        json!({
            "traceEvents": [
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "container", "ph": "b", "ts": 1230000000},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section1", "ph": "b", "ts": 1231000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section1", "ph": "e", "ts": 1233000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section2", "ph": "b", "ts": 1233000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2.1", "ph": "b", "ts": 1233000000,
                 "args": {"p": 3, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2.1", "ph": "e", "ts": 1236000000,
                 "args": {"p": 3, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section2", "ph": "e", "ts": 1236000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 5, "pid": 123,
                 "name": "section3", "ph": "b", "ts": 1236000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 5, "pid": 123,
                 "name": "section3", "ph": "e", "ts": 1240000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "container", "ph": "e", "ts": 1245000000,
                 "args": {"succeeded": true}},
            ],
            "displayTimeUnit": "ms",
            "otherData": {"test": "yes"}
        })
    );
}

#[test]
fn double_end_from_a_stale_handle_is_reported_once() {
    let clock = frozen_clock();
    let errors: Arc<Mutex<Vec<Error>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let config = scenario_config().error_policy(ErrorPolicy::Custom(Arc::new(move |err| {
        sink.lock().push(err.clone());
    })));
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::with_clock(collector, config, Arc::clone(&clock));

    let container = tracer.section("container");
    let section1 = tracer.section("section1");
    let section2 = tracer.section("section2");
    let section21 = tracer.section("section2.1");
    let section3 = tracer.section("section3");

    let (cx, mut container_span) = container.begin(&TraceContext::new());
    clock.advance(Duration::from_secs(1));

    let (_, mut stale) = section1.begin(&cx);
    clock.advance(Duration::from_secs(2));

    let (phase_cx, mut span) = stale.next_phase(&section2);
    let _ = section21.run(&phase_cx, |_| {
        clock.advance(Duration::from_secs(3));
        Ok::<_, &str>(())
    });
    let (_, _open) = span.next_phase(&section3);
    clock.advance(Duration::from_secs(4));

    // The phase-one handle already ended when the succession started.
    stale.end();

    clock.advance(Duration::from_secs(5));
    container_span.end();

    // Section3 began but never ended, and the extra end emitted nothing.
    assert_eq!(
        exported(&tracer, &records),
        json!({
            "traceEvents": [
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "container", "ph": "b", "ts": 1230000000},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section1", "ph": "b", "ts": 1231000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 2, "pid": 123,
                 "name": "section1", "ph": "e", "ts": 1233000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section2", "ph": "b", "ts": 1233000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2.1", "ph": "b", "ts": 1233000000,
                 "args": {"p": 3, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 4, "pid": 123,
                 "name": "section2.1", "ph": "e", "ts": 1236000000,
                 "args": {"p": 3, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 3, "pid": 123,
                 "name": "section2", "ph": "e", "ts": 1236000000,
                 "args": {"p": 1, "a": 1, "succeeded": true}},
                {"cat": "Section", "scope": "testscope", "id": 5, "pid": 123,
                 "name": "section3", "ph": "b", "ts": 1236000000,
                 "args": {"p": 1, "a": 1}},
                {"cat": "Section", "scope": "testscope", "id": 1, "pid": 123,
                 "name": "container", "ph": "e", "ts": 1245000000,
                 "args": {"succeeded": true}},
            ],
            "displayTimeUnit": "ms",
            "otherData": {"test": "yes"}
        })
    );

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "section 'section1' has already ended");
}

#[test]
fn spans_fan_out_across_threads() {
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::new(collector, Config::default().scope("pool"));

    let dispatch = tracer.section("dispatch");
    let handle = tracer.section("handle");

    let (cx, mut root) = dispatch.begin(&TraceContext::new());
    crossbeam::scope(|scope| {
        for _ in 0..4 {
            let worker = handle.clone();
            let cx = cx.clone();
            scope.spawn(move |_| {
                let _ = worker.run(&cx, |_| Ok::<_, &str>(()));
            });
        }
    })
    .unwrap();
    root.end();

    let records = records.lock();
    assert_eq!(records.len(), 10);

    let root_id = records[0].id;
    let mut worker_ids = Vec::new();
    for record in records.iter().skip(1) {
        if record.phase == Phase::Begin {
            worker_ids.push(record.id);
            assert_eq!(record.args.parent, Some(root_id));
            assert_eq!(record.args.ancestor, Some(root_id));
        }
        assert!(record.timestamp_us >= records[0].timestamp_us);
    }
    worker_ids.sort_unstable();
    worker_ids.dedup();
    assert_eq!(worker_ids.len(), 4);
}

#[test]
fn remote_info_links_two_tracers() {
    let (frontend_collector, frontend_records) = TestCollector::new();
    let frontend = Tracer::new(frontend_collector, Config::default().scope("frontend"));

    let (_, mut span) = frontend.section("request").begin(&TraceContext::new());
    let request_id = span.begin_record().unwrap().id;

    // What an RPC layer would put on the wire.
    let info = RemoteInfo {
        parent: NodeAndScope {
            scope: "frontend".to_string(),
            id: request_id,
        },
        ancestor: NodeAndScope {
            scope: "frontend".to_string(),
            id: request_id,
        },
    };
    let wire = serde_json::to_string(&info).unwrap();

    let (backend_collector, backend_records) = TestCollector::new();
    let backend = Tracer::new(backend_collector, Config::default().scope("backend"));
    let received: RemoteInfo = serde_json::from_str(&wire).unwrap();
    let cx = TraceContext::new().with_remote(&received);
    let _ = backend.section("query").run(&cx, |_| Ok::<_, &str>(()));

    span.end();

    let backend_records = backend_records.lock();
    let begin = &backend_records[0];
    assert_eq!(begin.args.parent, None);
    assert_eq!(begin.args.remote_parent, Some(request_id));
    assert_eq!(begin.args.remote_parent_scope.as_deref(), Some("frontend"));
    assert_eq!(begin.args.remote_ancestor, Some(request_id));
    assert_eq!(begin.args.remote_ancestor_scope.as_deref(), Some("frontend"));
    assert_eq!(frontend_records.lock().len(), 2);
}

#[test]
fn end_args_extend_begin_args() {
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::new(collector, Config::default());

    let outer = tracer.section("outer");
    let inner = tracer.section("inner");
    let _ = outer.run(&TraceContext::new(), |cx| {
        inner.run(cx, |_| Ok::<_, &str>(()))
    });

    let records = records.lock();
    assert_eq!(records.len(), 4);
    for (b, e) in [(0usize, 3usize), (1, 2)] {
        let (begin, end) = (&records[b], &records[e]);
        assert_eq!(begin.id, end.id);
        let mut expected = begin.args.clone();
        expected.succeeded = Some(true);
        assert_eq!(end.args, expected);
    }
}

#[test]
fn summary_round_trips_through_json() {
    let clock = frozen_clock();
    let (collector, records) = TestCollector::new();
    let tracer = Tracer::with_clock(collector, scenario_config(), Arc::clone(&clock));

    let section = tracer.section("work");
    let _ = section.run(&TraceContext::new(), |_| {
        clock.advance(Duration::from_millis(7));
        Ok::<_, &str>(())
    });

    let summary = tracer.export(records.lock().clone());
    let text = serde_json::to_string(&summary).unwrap();
    let parsed: Summary = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, summary);
}
