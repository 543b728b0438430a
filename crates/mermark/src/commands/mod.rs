//! CLI command implementations.

pub(crate) mod export;
pub(crate) mod render;
pub(crate) mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use mermark_config::{CliSettings, Config};
use mermark_diagrams::{DiagramRenderer, KrokiRenderer, RenderContext, Theme};
use mermark_export::PageGeometry;
use mermark_preview::{Preview, SpanRenderer};
use mermark_renderer::{CmarkRenderer, Segmenter, StyleMap};

use crate::error::CliError;
use crate::output::Output;

pub(crate) use export::ExportArgs;
pub(crate) use render::RenderArgs;
pub(crate) use watch::WatchArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover mermark.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Diagram theme: light or dark (overrides config).
    #[arg(long)]
    theme: Option<String>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, env = "MERMARK_KROKI_URL")]
    kroki_url: Option<String>,

    /// Enable verbose output (render timing and diagram logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            theme: self.theme.clone(),
            kroki_url: self.kroki_url.clone(),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Build a Kroki-backed preview from configuration.
pub(crate) fn build_preview(
    config: &Config,
    output: &Output,
) -> Result<Preview<KrokiRenderer>, CliError> {
    let renderer = KrokiRenderer::new(&config.diagrams_resolved.kroki_url)
        .with_timeout(Duration::from_secs(config.diagrams_resolved.timeout_secs));
    tracing::info!(kroki_url = %renderer.server_url(), "Using Kroki renderer");
    configure_preview(Arc::new(renderer), config, output)
}

/// Build a preview around any diagram renderer.
pub(crate) fn configure_preview<R: DiagramRenderer>(
    renderer: Arc<R>,
    config: &Config,
    output: &Output,
) -> Result<Preview<R>, CliError> {
    let theme = Theme::parse(&config.preview.theme).ok_or_else(|| {
        CliError::Validation(format!("unknown theme \"{}\"", config.preview.theme))
    })?;

    let mut styles = StyleMap::default();
    let warnings = styles.apply_overrides(
        config
            .styles
            .iter()
            .map(|(name, class)| (name.as_str(), class.as_str())),
    );
    for warning in &warnings {
        tracing::warn!("{warning}");
        output.warning(&format!("Warning: [styles] {warning}"));
    }

    let spans = SpanRenderer::new(CmarkRenderer::new(), styles);
    Ok(Preview::with_span_renderer(renderer, spans)
        .with_settle(Duration::from_millis(config.preview.settle_ms))
        .with_segmenter(Segmenter::new(config.diagrams_resolved.fence_tags.iter().cloned()))
        .with_context(RenderContext::with_theme(theme)))
}

/// Export page geometry from configuration.
pub(crate) fn page_geometry(config: &Config) -> PageGeometry {
    PageGeometry {
        width_mm: config.export.page_width_mm,
        height_mm: config.export.page_height_mm,
        margin_mm: config.export.margin_mm,
    }
}

/// Count rendered and failed diagrams.
pub(crate) fn diagram_counts<R: DiagramRenderer>(preview: &Preview<R>) -> (usize, usize) {
    preview.sessions().fold((0, 0), |(rendered, failed), session| {
        if session.error().is_some() {
            (rendered, failed + 1)
        } else if session.output().is_some() {
            (rendered + 1, failed)
        } else {
            (rendered, failed)
        }
    })
}

/// Report diagram failures after a render.
pub(crate) fn report_diagrams<R: DiagramRenderer>(preview: &Preview<R>, output: &Output) {
    let (rendered, failed) = diagram_counts(preview);
    if failed > 0 {
        output.warning(&format!(
            "{failed} of {} diagrams failed to render",
            rendered + failed
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mermark_diagrams::mock::{FAIL_MARKER, MockRenderer};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_configure_preview_applies_config() {
        let mut config = Config::default();
        config.preview.theme = "dark".to_owned();
        config.preview.settle_ms = 300;
        config.diagrams_resolved.fence_tags = vec!["mmd".to_owned()];

        let preview =
            configure_preview(Arc::new(MockRenderer::new()), &config, &Output::new()).unwrap();
        assert_eq!(preview.context().theme, Theme::Dark);
        assert_eq!(preview.settle_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_configure_preview_rejects_unknown_theme() {
        let mut config = Config::default();
        config.preview.theme = "sepia".to_owned();

        let result = configure_preview(Arc::new(MockRenderer::new()), &config, &Output::new());
        assert!(matches!(result, Err(CliError::Validation(_))));
    }

    #[test]
    fn test_page_geometry_from_config() {
        let mut config = Config::default();
        config.export.margin_mm = 15.0;

        assert_eq!(
            page_geometry(&config),
            PageGeometry {
                margin_mm: 15.0,
                ..PageGeometry::default()
            }
        );
    }

    #[tokio::test]
    async fn test_custom_fence_tags_and_counts() {
        let mut config = Config::default();
        config.diagrams_resolved.fence_tags = vec!["mmd".to_owned()];
        let mut preview =
            configure_preview(Arc::new(MockRenderer::new()), &config, &Output::new()).unwrap();

        preview.set_document(format!(
            "```mmd\ngraph TD\nA-->B\n```\n\n```mmd\ngraph TD\n{FAIL_MARKER}\n```\n\n```mermaid\npie\n```\n"
        ));
        preview.settle().await;

        assert_eq!(diagram_counts(&preview), (1, 1));
    }
}
