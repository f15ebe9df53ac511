// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::id::NodeId;
use crate::record::Args;

/// A span id qualified by the scope of the process that issued it.
///
/// Node ids are only unique within one tracer, so cross-process linkage
/// always travels with the issuer's scope attached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAndScope {
    pub scope: String,
    pub id: NodeId,
}

/// Linkage to a span hierarchy in another process.
///
/// The upstream process fills this from its own context and sends it along
/// with the request; the downstream process attaches it to a fresh carrier
/// via [`TraceContext::with_remote`]. Both halves are required: a carrier
/// holding only one of them fails [`TraceContext::remote_info`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    pub parent: NodeAndScope,
    pub ancestor: NodeAndScope,
}

/// The carrier that threads span lineage through call paths.
///
/// A carrier is an immutable value over four optional keys: local parent,
/// local ancestor, remote parent, and remote ancestor. Beginning a span
/// derives a child carrier; nothing ever mutates an existing one, so a
/// carrier can fan out to any number of concurrent branches.
///
/// # Examples
///
/// ```
/// use sectrace::ConsoleCollector;
/// use sectrace::Config;
/// use sectrace::TraceContext;
/// use sectrace::Tracer;
///
/// let tracer = Tracer::new(ConsoleCollector, Config::default());
/// let root = tracer.section("request");
///
/// let (cx, mut span) = root.begin(&TraceContext::new());
/// assert_eq!(cx.parent(), cx.ancestor());
/// span.end();
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceContext {
    parent: Option<NodeId>,
    ancestor: Option<NodeId>,
    remote_parent: Option<NodeAndScope>,
    remote_ancestor: Option<NodeAndScope>,
}

impl TraceContext {
    /// An empty carrier. Spans begun against it become roots.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of the nearest enclosing span, if any.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The id of the root span of the enclosing hierarchy, if any.
    #[inline]
    pub fn ancestor(&self) -> Option<NodeId> {
        self.ancestor
    }

    /// Derive the carrier handed to children of a newly begun span: the new
    /// span becomes the parent, and a root span also becomes the ancestor
    /// of everything below it.
    pub(crate) fn with_local(&self, id: NodeId, is_root: bool) -> Self {
        let mut child = self.clone();
        child.parent = Some(id);
        if is_root {
            child.ancestor = Some(id);
        }
        child
    }

    /// Attach cross-process linkage received from an upstream process.
    #[must_use]
    pub fn with_remote(&self, info: &RemoteInfo) -> Self {
        let mut cx = self.clone();
        cx.remote_parent = Some(info.parent.clone());
        cx.remote_ancestor = Some(info.ancestor.clone());
        cx
    }

    /// Read back cross-process linkage.
    ///
    /// Returns `Ok(None)` when no remote key is set at all. Once any remote
    /// key is present the linkage must be complete, with non-empty scopes
    /// and non-zero ids; anything less is an [`Error::IncompleteRemoteInfo`].
    pub fn remote_info(&self) -> Result<Option<RemoteInfo>, Error> {
        if self.remote_parent.is_none() && self.remote_ancestor.is_none() {
            return Ok(None);
        }

        let parent = self.remote_parent.clone().unwrap_or_default();
        let ancestor = self.remote_ancestor.clone().unwrap_or_default();

        if ancestor.scope.is_empty() {
            return Err(Error::IncompleteRemoteInfo {
                missing: "ancestor scope",
            });
        }
        if parent.scope.is_empty() {
            return Err(Error::IncompleteRemoteInfo {
                missing: "parent scope",
            });
        }
        if parent.id.is_zero() {
            return Err(Error::IncompleteRemoteInfo {
                missing: "parent id",
            });
        }
        if ancestor.id.is_zero() {
            return Err(Error::IncompleteRemoteInfo {
                missing: "ancestor id",
            });
        }

        Ok(Some(RemoteInfo { parent, ancestor }))
    }

    /// Flatten the carrier into record args: local lineage as-is, remote
    /// linkage only after it validates.
    pub(crate) fn to_args(&self) -> Result<Args, Error> {
        let mut args = Args {
            parent: self.parent,
            ancestor: self.ancestor,
            ..Args::default()
        };
        if let Some(info) = self.remote_info()? {
            args.remote_parent = Some(info.parent.id);
            args.remote_parent_scope = Some(info.parent.scope);
            args.remote_ancestor = Some(info.ancestor.id);
            args.remote_ancestor_scope = Some(info.ancestor.scope);
        }
        Ok(args)
    }
}
