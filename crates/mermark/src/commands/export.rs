//! `mermark export` command implementation.

use std::path::PathBuf;

use clap::Args;
use mermark_export::{Exporter, PdfPaginator, PrintHtmlPaginator};

use super::{CommonArgs, build_preview, page_geometry, report_diagrams};
use crate::error::CliError;
use crate::input::Input;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Markdown file, `-` for stdin, or an http(s) URL.
    input: Input,

    /// Path of the document to write.
    #[arg(short, long)]
    output: PathBuf,

    /// Write print-ready HTML instead of PDF.
    #[arg(long)]
    html: bool,

    /// Document title (default: derived from the input name).
    #[arg(long)]
    title: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl ExportArgs {
    /// Execute the export command.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let mut preview = build_preview(&config, &output)?;

        preview.set_document(self.input.read().await?);

        let title = self.title.clone().unwrap_or_else(|| self.input.title());
        let geometry = page_geometry(&config);
        let artifact = if self.html {
            Exporter::new(PrintHtmlPaginator::new(title), geometry)
                .export(&mut preview)
                .await?
        } else {
            Exporter::new(PdfPaginator::new(title), geometry)
                .export(&mut preview)
                .await?
        };
        report_diagrams(&preview, &output);

        tokio::fs::write(&self.output, artifact.bytes()).await?;
        output.success(&format!(
            "Exported {} to {} ({}, {} bytes)",
            self.input,
            self.output.display(),
            artifact.media_type(),
            artifact.bytes().len()
        ));
        Ok(())
    }
}
