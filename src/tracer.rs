// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::collect::Collect;
use crate::error::Error;
use crate::error::ErrorPolicy;
use crate::id::IdGenerator;
use crate::id::NodeId;
use crate::record::Args;
use crate::record::Phase;
use crate::record::Record;
use crate::record::Summary;
use crate::section::Section;

/// Settings for a [`Tracer`], fixed at construction.
///
/// # Examples
///
/// ```
/// use sectrace::Config;
/// use sectrace::ErrorPolicy;
///
/// let config = Config::default()
///     .scope("storage")
///     .error_policy(ErrorPolicy::Log);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) category: Cow<'static, str>,
    pub(crate) scope: Option<Cow<'static, str>>,
    pub(crate) process_id: u32,
    pub(crate) display_time_unit: Cow<'static, str>,
    pub(crate) other_data: Map<String, Value>,
    pub(crate) strict: bool,
    pub(crate) error_policy: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            category: Cow::Borrowed("Section"),
            scope: None,
            process_id: std::process::id(),
            display_time_unit: Cow::Borrowed("ms"),
            other_data: Map::new(),
            strict: false,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl Config {
    /// Category label stamped on every record. Defaults to `"Section"`.
    #[must_use]
    pub fn category(self, category: impl Into<Cow<'static, str>>) -> Self {
        Self {
            category: category.into(),
            ..self
        }
    }

    /// Scope label stamped on every record, and the label other processes
    /// use to refer to this tracer's ids in remote linkage. Unset by
    /// default, in which case records carry no scope member.
    #[must_use]
    pub fn scope(self, scope: impl Into<Cow<'static, str>>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..self
        }
    }

    /// Process id stamped on every record. Defaults to the real pid.
    #[must_use]
    pub fn process_id(self, process_id: u32) -> Self {
        Self { process_id, ..self }
    }

    /// Time unit viewers should display durations in. Defaults to `"ms"`.
    #[must_use]
    pub fn display_time_unit(self, unit: impl Into<Cow<'static, str>>) -> Self {
        Self {
            display_time_unit: unit.into(),
            ..self
        }
    }

    /// Free-form metadata copied into every exported summary.
    #[must_use]
    pub fn other_data(self, other_data: Map<String, Value>) -> Self {
        Self { other_data, ..self }
    }

    /// Development mode: section names must be unique per tracer, and every
    /// usage error panics no matter which [`ErrorPolicy`] is installed.
    #[must_use]
    pub fn strict(self, strict: bool) -> Self {
        Self { strict, ..self }
    }

    /// How usage errors are reported. Defaults to [`ErrorPolicy::Panic`].
    #[must_use]
    pub fn error_policy(self, error_policy: ErrorPolicy) -> Self {
        Self {
            error_policy,
            ..self
        }
    }
}

struct TracerInner {
    collect: Box<dyn Collect>,
    clock: Box<dyn Clock>,
    id_generator: IdGenerator,
    // Only populated in strict mode. Grows with distinct names, not spans.
    seen_names: Mutex<HashSet<String>>,
    config: Config,
}

/// The owner of everything a trace needs: the collector, the clock, the id
/// counter, and the configuration.
///
/// A `Tracer` is a cheap handle; clones share one instance. Independent
/// tracers are fully isolated from each other, so tests never reset shared
/// state between cases.
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
/// let tracer = Tracer::new(collector, Config::default().scope("demo"));
///
/// let section = tracer.section("request");
/// let (cx, mut span) = section.begin(&TraceContext::new());
/// // ... work with `cx` ...
/// span.end();
///
/// let summary = tracer.export(records.lock().clone());
/// println!("{}", serde_json::to_string_pretty(&summary).unwrap());
/// ```
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    /// A tracer reading the system clock.
    pub fn new(collect: impl Collect, config: Config) -> Self {
        Self::with_clock(collect, config, SystemClock::new())
    }

    /// A tracer reading an injected clock. Tests pair this with
    /// [`TestClock`](crate::TestClock) for deterministic timestamps.
    pub fn with_clock(collect: impl Collect, config: Config, clock: impl Clock) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                collect: Box::new(collect),
                clock: Box::new(clock),
                id_generator: IdGenerator::default(),
                seen_names: Mutex::new(HashSet::new()),
                config,
            }),
        }
    }

    /// A descriptor for a kind of traced operation.
    ///
    /// Descriptors are reusable values: create one per operation kind and
    /// begin as many spans from it as the operation runs. In strict mode a
    /// name this tracer has already handed out is a usage error, though the
    /// descriptor is returned either way.
    pub fn section(&self, name: impl Into<Cow<'static, str>>) -> Section {
        let name = name.into();
        if self.inner.config.strict {
            let duplicate = !self.inner.seen_names.lock().insert(name.to_string());
            if duplicate {
                self.usage_error(Error::DuplicateName {
                    name: name.to_string(),
                });
            }
        }
        Section::new(self.clone(), name)
    }

    /// Package collected records into a trace document, in the order given.
    ///
    /// No reordering, filtering, or deduplication happens here. The record
    /// list is whatever the collector accumulated.
    pub fn export(&self, records: Vec<Record>) -> Summary {
        let config = &self.inner.config;
        Summary {
            trace_events: records,
            display_time_unit: config.display_time_unit.to_string(),
            other_data: if config.other_data.is_empty() {
                None
            } else {
                Some(config.other_data.clone())
            },
        }
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        self.inner.collect.on_node_id();
        self.inner.id_generator.next_id()
    }

    pub(crate) fn now_micros(&self) -> i64 {
        self.inner.clock.now_micros()
    }

    pub(crate) fn collect(&self) -> &dyn Collect {
        &*self.inner.collect
    }

    pub(crate) fn make_record(
        &self,
        name: Cow<'static, str>,
        id: NodeId,
        phase: Phase,
        timestamp_us: i64,
    ) -> Record {
        let config = &self.inner.config;
        Record {
            category: config.category.clone(),
            name,
            phase,
            scope: config.scope.clone(),
            timestamp_us,
            id,
            process_id: config.process_id,
            args: Args::default(),
        }
    }

    /// Strict mode wins over the installed policy so programming mistakes
    /// surface in development regardless of production configuration.
    pub(crate) fn usage_error(&self, err: Error) {
        if self.inner.config.strict {
            panic!("usage error in strict mode: {}", err);
        }
        self.inner.config.error_policy.handle(err);
    }
}
