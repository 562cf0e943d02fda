use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use shared::{
    domain::{RegionName, SnapshotEpoch},
    protocol::{empty_region_context, region_context, StateSnapshot},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::DocumentHost;

/// The markup source for one region, opaque to the client. Whatever engine
/// the embedder supplies interprets it.
#[derive(Debug, Clone)]
pub struct Template(String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

/// Pure rendering seam: `render(template, context) -> markup`.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &Template, context: &Value) -> Result<String>;
}

/// Fixed mapping from region name to template. Pure data; regions always
/// paint in [`RegionName::ALL`] order regardless of registration order.
pub struct ViewRegistry {
    templates: HashMap<RegionName, Template>,
}

impl ViewRegistry {
    pub fn new(templates: impl IntoIterator<Item = (RegionName, Template)>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    pub fn template(&self, region: RegionName) -> Option<&Template> {
        self.templates.get(&region)
    }

    pub fn regions(&self) -> impl Iterator<Item = RegionName> + '_ {
        RegionName::ALL
            .into_iter()
            .filter(|region| self.templates.contains_key(region))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewRegion {
    pub last_rendered_at: Option<SnapshotEpoch>,
    pub sticky: bool,
}

struct RenderState {
    epoch: SnapshotEpoch,
    regions: HashMap<RegionName, ViewRegion>,
}

/// Paints snapshots into the document. Every region gets full-overwrite
/// semantics except chat, which is treated as an append-only log: once it
/// holds content, ordinary synchronization cycles leave it alone.
pub struct ViewRenderer {
    registry: ViewRegistry,
    templates: Arc<dyn TemplateEngine>,
    document: Arc<dyn DocumentHost>,
    inner: Mutex<RenderState>,
}

impl ViewRenderer {
    pub fn new(
        registry: ViewRegistry,
        templates: Arc<dyn TemplateEngine>,
        document: Arc<dyn DocumentHost>,
    ) -> Arc<Self> {
        let regions = registry
            .regions()
            .map(|region| (region, ViewRegion::default()))
            .collect();
        Arc::new(Self {
            registry,
            templates,
            document,
            inner: Mutex::new(RenderState {
                epoch: SnapshotEpoch(0),
                regions,
            }),
        })
    }

    pub async fn apply_snapshot(&self, snapshot: &StateSnapshot) -> Result<()> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.epoch.0 += 1;
            inner.epoch
        };

        for region in self.registry.regions() {
            let Some(template) = self.registry.template(region) else {
                continue;
            };
            if region == RegionName::Chat {
                self.render_chat(epoch, template, snapshot).await?;
            } else {
                let markup = self.templates.render(template, &context_for(region, snapshot))?;
                self.document.replace_region(region, &markup).await;
                self.mark_rendered(region, epoch).await;
            }
        }
        Ok(())
    }

    /// Chat only paints into an empty region. The snapshot may not carry full
    /// history, so content that is already on screen must survive; a full
    /// resynchronization un-sticks it only if the host actually cleared the
    /// region.
    async fn render_chat(
        &self,
        epoch: SnapshotEpoch,
        template: &Template,
        snapshot: &StateSnapshot,
    ) -> Result<()> {
        let displayed = self.document.region_html(RegionName::Chat).await;
        if !displayed.trim().is_empty() {
            let mut inner = self.inner.lock().await;
            inner.regions.entry(RegionName::Chat).or_default().sticky = true;
            return Ok(());
        }

        let markup = self
            .templates
            .render(template, &context_for(RegionName::Chat, snapshot))?;
        self.document.replace_region(RegionName::Chat, &markup).await;

        let mut inner = self.inner.lock().await;
        let slot = inner.regions.entry(RegionName::Chat).or_default();
        slot.last_rendered_at = Some(epoch);
        if !markup.trim().is_empty() {
            slot.sticky = true;
        }
        Ok(())
    }

    async fn mark_rendered(&self, region: RegionName, epoch: SnapshotEpoch) {
        let mut inner = self.inner.lock().await;
        inner.regions.entry(region).or_default().last_rendered_at = Some(epoch);
    }

    pub async fn region(&self, region: RegionName) -> ViewRegion {
        self.inner
            .lock()
            .await
            .regions
            .get(&region)
            .copied()
            .unwrap_or_default()
    }
}

fn context_for(region: RegionName, snapshot: &StateSnapshot) -> Value {
    match region_context(region, snapshot) {
        Ok(context) => context,
        Err(err) => {
            warn!(region = ?region, "render: snapshot fields rejected, using defaults: {err}");
            empty_region_context(region)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_with(fields: Value) -> StateSnapshot {
        let mut raw = fields;
        raw["id"] = json!(1);
        serde_json::from_value(raw).expect("snapshot")
    }

    #[test]
    fn registry_iterates_in_fixed_order() {
        let registry = ViewRegistry::new([
            (RegionName::Chat, Template::new("chat")),
            (RegionName::List, Template::new("list")),
            (RegionName::Game, Template::new("game")),
        ]);
        let order: Vec<_> = registry.regions().collect();
        assert_eq!(
            order,
            vec![RegionName::List, RegionName::Game, RegionName::Chat]
        );
    }

    #[test]
    fn missing_region_fields_default_instead_of_leaking() {
        let snapshot = snapshot_with(json!({"type": "in_progress", "round": 2}));
        let context = context_for(RegionName::Game, &snapshot);
        assert_eq!(context["round"], json!(2));
        assert_eq!(context["pot"], json!(0));
        assert_eq!(context["table"], json!([]));
        assert_eq!(context["type"], json!("in_progress"));
    }

    #[test]
    fn mistyped_region_fields_fall_back_to_empty_context() {
        let snapshot = snapshot_with(json!({"pot": "a heap of gold"}));
        let context = context_for(RegionName::Game, &snapshot);
        assert_eq!(context["pot"], json!(0));
    }

    #[test]
    fn chat_context_claims_only_chat_lines() {
        let snapshot = snapshot_with(json!({
            "pot": 4,
            "chat": [{"speaker": "ana", "message": "hello"}]
        }));
        let context = context_for(RegionName::Chat, &snapshot);
        assert_eq!(context["chat"][0]["speaker"], json!("ana"));
        assert!(context.get("pot").is_none());
    }
}
