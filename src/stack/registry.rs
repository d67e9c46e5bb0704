//! Container image repository.

use crate::config::StackConfig;
use crate::core::SynthResult;
use crate::graph::{AttributeValue, Attributes, GraphBuilder, NodeHandle, ResourceKind};

/// Declare the image repository, named `<project>-<service>`.
///
/// Tags are mutable so `latest` can be re-pushed, and the repository is
/// force-deleted on teardown even when it still holds images.
pub fn declare_registry(config: &StackConfig, builder: &mut GraphBuilder) -> SynthResult<NodeHandle> {
    builder.add_node(
        ResourceKind::EcrRepository,
        "ecr-repo",
        Attributes::new()
            .set("name", format!("{}-{}", config.project, config.service))
            .set("image_scanning_configuration", AttributeValue::map([("scan_on_push", true)]))
            .set("image_tag_mutability", "MUTABLE")
            .set("force_delete", true),
    )
}
