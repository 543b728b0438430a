//! `mermark render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use mermark_diagrams::DiagramRenderer;
use mermark_preview::Preview;

use super::{CommonArgs, build_preview, report_diagrams};
use crate::error::CliError;
use crate::input::Input;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file, `-` for stdin, or an http(s) URL.
    input: Input,

    /// Write the HTML fragment to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl RenderArgs {
    /// Execute the render command.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let mut preview = build_preview(&config, &output)?;

        let text = self.input.read().await?;
        let html = render_settled(&mut preview, text).await;
        report_diagrams(&preview, &output);

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, html).await?;
                output.success(&format!("Rendered {} to {}", self.input, path.display()));
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(html.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// Load the document and wait for every diagram before serializing.
pub(crate) async fn render_settled<R: DiagramRenderer>(
    preview: &mut Preview<R>,
    text: String,
) -> String {
    preview.set_document(text);
    preview.settle().await;
    preview.to_html()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use mermark_diagrams::mock::MockRenderer;

    #[tokio::test]
    async fn test_render_settled_has_no_placeholders() {
        let mut preview = Preview::new(Arc::new(MockRenderer::new()));
        let html = render_settled(
            &mut preview,
            "# Plan\n\n```diagram\nclass Order\n```\n\nDone.\n".to_owned(),
        )
        .await;

        assert!(html.contains("Plan</h1>"));
        assert!(html.contains("<svg"));
        assert!(!html.contains("diagram-pending"));
        assert!(html.find("<svg").unwrap() < html.find("Done.").unwrap());
    }
}
