use crate::core::cortex::{render_system_prompt, user_prompt, Completion};
use crate::core::parser::normalize_with;
use crate::error::ExtractError;
use crate::schema::{DraftDefaults, NodeCategory, SchemaDraft};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PREVIEW_CHARS: usize = 100;

/// Text in, `SchemaDraft` out: one completion call per request.
pub struct Extractor {
    completion: Arc<dyn Completion>,
    system_prompt: String,
    defaults: DraftDefaults,
}

impl Extractor {
    pub fn new(completion: Arc<dyn Completion>, defaults: DraftDefaults) -> Self {
        Self {
            completion,
            system_prompt: render_system_prompt(&defaults),
            defaults,
        }
    }

    pub async fn extract(&self, text: &str) -> Result<SchemaDraft, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::InvalidInput);
        }

        info!(preview = %preview(text), "extract request received");

        let raw = self
            .completion
            .complete(&self.system_prompt, &user_prompt(text))
            .await?;
        let draft = normalize_with(&raw, &self.defaults)?;

        info!(nodes = draft.nodes.len(), edges = draft.edges.len(), "extraction complete");
        if draft.is_empty() {
            warn!("model reply decoded to an empty draft");
        }
        for node in &draft.nodes {
            if NodeCategory::parse(&node.data.category).is_none() {
                debug!(id = %node.id, category = %node.data.category, "category outside the known element kinds");
            }
            debug!(
                id = %node.id,
                label = %node.data.label,
                category = %node.data.category,
                x = node.position.x,
                y = node.position.y,
                "node"
            );
        }
        for edge in &draft.edges {
            debug!(id = %edge.id, source = %edge.source, target = %edge.target, label = %edge.label, "edge");
        }

        Ok(draft)
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
