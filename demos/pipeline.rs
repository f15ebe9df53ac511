// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

//! A multi-phase pipeline traced end to end. The captured trace document is
//! dumped to stdout as JSON, ready to load into a trace viewer.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::info;
use parking_lot::Mutex;
use rand::Rng;
use sectrace::Collect;
use sectrace::Config;
use sectrace::Record;
use sectrace::Section;
use sectrace::TraceContext;
use sectrace::Tracer;

struct CaptureCollector {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Collect for CaptureCollector {
    fn on_begin(&self, record: &Record) {
        self.records.lock().push(record.clone());
    }

    fn on_end(&self, _begin: &Record, end: &Record) {
        self.records.lock().push(end.clone());
    }

    fn on_timing(&self, overhead: Duration, internal: Duration, has_parent: bool) {
        if !has_parent {
            info!(
                "root section ran {:?} with {:?} of tracing overhead",
                internal, overhead
            );
        }
    }
}

/// Five shards handled concurrently, all reporting failure.
fn ingest(shard: &Section, cx: &TraceContext) {
    crossbeam::scope(|scope| {
        for _ in 0..5 {
            let shard = shard.clone();
            let cx = cx.clone();
            scope.spawn(move |_| {
                let _ = shard.run(&cx, |_| {
                    let millis = rand::thread_rng().gen_range(50..400u64);
                    thread::sleep(Duration::from_millis(millis));
                    Err::<(), &str>("shard lagging")
                });
            });
        }
    })
    .unwrap();
}

/// A recursive flush, one nested span per round.
fn flush_batches(section: &Section, cx: &TraceContext, rounds: u32) -> Result<(), String> {
    let (cx, mut span) = section.begin(cx);
    let result = if rounds > 0 {
        thread::sleep(Duration::from_millis(50));
        flush_batches(section, &cx, rounds - 1)
    } else {
        Ok(())
    };
    span.end_with(&result);
    result
}

fn main() {
    env_logger::init();

    let records = Arc::new(Mutex::new(Vec::new()));
    let collector = CaptureCollector {
        records: Arc::clone(&records),
    };
    let tracer = Tracer::new(collector, Config::default().scope("pipeline"));

    let pipeline = tracer.section("pipeline");
    let setup = pipeline.subsection("setup");
    let ingest_phase = pipeline.subsection("ingest");
    let drain_phase = pipeline.subsection("drain");
    let shard = tracer.section("shard");
    let flush = tracer.section("flush");

    let outcome = pipeline.run(&TraceContext::new(), |cx| {
        let (_, mut span) = setup.begin(cx);
        thread::sleep(Duration::from_millis(50));

        let (cx, mut span) = span.next_phase(&ingest_phase);
        ingest(&shard, &cx);

        let (cx, mut span) = span.next_phase(&drain_phase);
        let result = flush_batches(&flush, &cx, 5);
        span.end_with(&result);
        result
    });
    info!("pipeline finished: {:?}", outcome);

    let summary = tracer.export(records.lock().clone());
    println!("{}", serde_json::to_string_pretty(&summary).unwrap());
}
