//! This module turns routing into bytes: the frame format, the routing plan
//! recorded in it, and the orchestrators that run dispatch, clustering and the
//! successors for one call.

pub mod artifact;
pub mod format;
pub mod orchestrator;

pub use artifact::{GraphFrame, HeaderInfo};
pub use format::{GroupPlan, MemberPlan, RoutingPlan, SourcePlan};
pub use orchestrator::Decompressed;
