// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

/// An identifier for a single span, unique within the issuing [`Tracer`].
///
/// Ids are positive, assigned in increasing order starting from 1, and never
/// reused. A value of zero never identifies a live span, which is why remote
/// linkage treats a zero id as absent.
///
/// [`Tracer`]: crate::Tracer
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Hands out `NodeId`s from an atomic counter. One per tracer.
///
/// The counter wraps at `u32::MAX` without a reuse guard.
#[derive(Default)]
pub(crate) struct IdGenerator {
    next: AtomicU32,
}

impl IdGenerator {
    #[inline]
    pub(crate) fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}
