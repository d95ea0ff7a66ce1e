use std::sync::Arc;

use crate::config::Config;
use crate::layout::height::LayoutSurface;
use crate::layout::preview::PreviewRegistry;
use crate::layout::template::TemplateConfig;
use crate::layout::validate::ValidationRules;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Template used when a request doesn't carry one. Validated at startup.
    pub default_template: TemplateConfig,
    pub rules: ValidationRules,
    /// Layout surface for measured heights. Default: `ShapedSurface`.
    pub surface: Arc<dyn LayoutSurface>,
    pub previews: PreviewRegistry,
}

impl AppState {
    pub fn new(config: &Config, default_template: TemplateConfig, surface: Arc<dyn LayoutSurface>) -> Self {
        let rules = config.validation_rules();
        let previews = PreviewRegistry::new(
            config.layout_debounce,
            config.preview_idle_ttl,
            rules.clone(),
            Arc::clone(&surface),
        );
        AppState {
            default_template,
            rules,
            surface,
            previews,
        }
    }
}
