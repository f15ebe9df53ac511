// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::borrow::Cow;

use serde::Deserialize;
use serde::Serialize;

use crate::id::NodeId;

/// Which edge of a span a record marks.
///
/// The wire values are the async-event phase letters of the trace-event
/// format, so exported files load directly into chrome://tracing and
/// Perfetto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "b")]
    Begin,
    #[serde(rename = "e")]
    End,
}

/// Lineage and outcome attached to a record, under the reserved arg keys.
///
/// Unset keys stay off the wire entirely; a root span's begin record
/// serializes with no `args` member at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Args {
    /// Id of the nearest enclosing span.
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    /// Id of the root of the enclosing hierarchy.
    #[serde(rename = "a", skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<NodeId>,
    #[serde(rename = "rp", skip_serializing_if = "Option::is_none")]
    pub remote_parent: Option<NodeId>,
    #[serde(rename = "rps", skip_serializing_if = "Option::is_none")]
    pub remote_parent_scope: Option<String>,
    #[serde(rename = "ra", skip_serializing_if = "Option::is_none")]
    pub remote_ancestor: Option<NodeId>,
    #[serde(rename = "ras", skip_serializing_if = "Option::is_none")]
    pub remote_ancestor_scope: Option<String>,
    /// Whether the unit of work reported success. End records only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<bool>,
}

impl Args {
    pub fn is_empty(&self) -> bool {
        *self == Args::default()
    }
}

/// One trace event: the begin or end edge of a single span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "cat")]
    pub category: Cow<'static, str>,
    pub name: Cow<'static, str>,
    #[serde(rename = "ph")]
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scope: Option<Cow<'static, str>>,
    /// Microseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp_us: i64,
    pub id: NodeId,
    #[serde(rename = "pid")]
    pub process_id: u32,
    #[serde(skip_serializing_if = "Args::is_empty", default)]
    pub args: Args,
}

impl Record {
    /// The end edge matching `begin`: same identity, the end phase and
    /// timestamp, and the begin args extended with the outcome flag.
    pub(crate) fn end_from(begin: &Record, timestamp_us: i64, succeeded: bool) -> Record {
        let mut args = begin.args.clone();
        args.succeeded = Some(succeeded);
        Record {
            phase: Phase::End,
            timestamp_us,
            args,
            ..begin.clone()
        }
    }
}

/// A complete trace document in the trace-event JSON format.
///
/// `trace_events` preserves the order records were handed to
/// [`Tracer::export`]; viewers pair begin and end edges by id, so emission
/// order is all the ordering there is.
///
/// [`Tracer::export`]: crate::Tracer::export
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub trace_events: Vec<Record>,
    pub display_time_unit: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub other_data: Option<serde_json::Map<String, serde_json::Value>>,
}
