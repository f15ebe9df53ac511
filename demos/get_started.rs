// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use sectrace::Config;
use sectrace::ConsoleCollector;
use sectrace::TraceContext;
use sectrace::Tracer;

fn main() {
    let tracer = Tracer::new(ConsoleCollector, Config::default());

    let request = tracer.section("request");
    let decode = request.subsection("decode");

    let (cx, mut span) = request.begin(&TraceContext::new());
    let _ = decode.run(&cx, |_| {
        // do something ...
        Ok::<_, String>(())
    });
    span.end();
}
