//! Recursive concurrent tree walk
//!
//! `walk` stats the root and hands every node to a [`Visitor`]:
//!
//! - a file is visited and that completes its walk
//! - a directory is visited, and only once that visit has finished are its
//!   children listed and walked, all of them concurrently
//!
//! A directory's own visit (for a sync, creating it at the destination) is
//! therefore finished before anything nested under it starts. Siblings have
//! no ordering between them.
//!
//! Children are joined fail-fast: the first error drops the sibling walks
//! still in flight, which cancels them at their next suspension point.
//! Every backend step holds a permit from the [`FanOutLimiter`] for its own
//! duration only.

use crate::capability::{join_child, Capability, VisitEvent};
use crate::error::Result;
use crate::limiter::FanOutLimiter;
use futures::future::{try_join_all, FutureExt, LocalBoxFuture};
use tracing::trace;

/// Callback invoked once per node of a walk
#[allow(async_fn_in_trait)]
pub trait Visitor {
    /// Handle one node
    ///
    /// # Errors
    ///
    /// Any error fails the node and, through it, every ancestor's walk
    async fn visit(&self, event: VisitEvent) -> Result<()>;
}

/// Walk every node under `root` on `capability`
///
/// # Errors
///
/// `NotFound` when `root` does not exist, otherwise the first error raised
/// by a stat, a listing or a visit anywhere in the tree
pub async fn walk<C, V>(
    root: &str,
    capability: &C,
    visitor: &V,
    limiter: &FanOutLimiter,
) -> Result<()>
where
    C: Capability,
    V: Visitor,
{
    walk_node(root.to_string(), capability, visitor, limiter).await
}

fn walk_node<'a, C, V>(
    path: String,
    capability: &'a C,
    visitor: &'a V,
    limiter: &'a FanOutLimiter,
) -> LocalBoxFuture<'a, Result<()>>
where
    C: Capability + 'a,
    V: Visitor + 'a,
{
    async move {
        let info = {
            let _permit = limiter.acquire().await;
            capability.stat(&path).await?
        };

        if !info.is_directory {
            return visitor.visit(VisitEvent::file(path)).await;
        }

        visitor.visit(VisitEvent::directory(path.clone())).await?;

        let children = {
            let _permit = limiter.acquire().await;
            capability.list_children(&path).await?
        };
        trace!("{}: {} children", path, children.len());

        try_join_all(
            children
                .iter()
                .map(|name| walk_node(join_child(&path, name), capability, visitor, limiter)),
        )
        .await?;
        Ok(())
    }
    .boxed_local()
}
