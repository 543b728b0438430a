//! `mermark watch` command implementation.
//!
//! Keeps a preview of one Markdown file and rewrites an HTML page whenever the
//! file changes or a diagram render completes. Lines typed on stdin control
//! the preview: `t` toggles the theme, `r` re-renders every diagram.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use mermark_diagrams::DiagramRenderer;
use mermark_export::{PageGeometry, PrintHtmlPaginator};
use mermark_preview::Preview;
use notify::{RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{CommonArgs, build_preview, page_geometry, report_diagrams};
use crate::error::CliError;
use crate::input::Input;
use crate::output::Output;

/// How often finished renders are picked up.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Markdown file to watch.
    input: PathBuf,

    /// HTML page to keep up to date.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl WatchArgs {
    /// Execute the watch command. Runs until interrupted.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let mut preview = build_preview(&config, &output)?;
        let input = Input::File(self.input.clone());
        let page = Page {
            paginator: PrintHtmlPaginator::new(input.title()),
            geometry: page_geometry(&config),
            path: self.output.clone(),
        };

        preview.set_document(input.read().await?);
        page.write(&preview).await?;

        // Watch the parent directory so editors that save by rename are seen.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let file_name = self.input.file_name().map(OsString::from);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res
                && is_change_to(&event, file_name.as_deref())
            {
                let _ = tx.send(());
            }
        })?;
        watcher.watch(watch_dir(&self.input), RecursiveMode::NonRecursive)?;

        output.info(&format!(
            "Watching {} -> {} (t: toggle theme, r: re-render, Ctrl+C: stop)",
            self.input.display(),
            self.output.display()
        ));

        let mut commands = BufReader::new(tokio::io::stdin()).lines();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(()) = rx.recv() => {
                    match input.read().await {
                        Ok(text) if text != preview.document() => {
                            preview.set_document(text);
                            page.write(&preview).await?;
                        }
                        Ok(_) => {}
                        Err(e) => output.warning(&format!("Warning: {e}")),
                    }
                }
                Ok(Some(line)) = commands.next_line() => {
                    match WatchCommand::parse(&line) {
                        Some(WatchCommand::ToggleTheme) => {
                            let theme = preview.context().theme.toggled();
                            preview.set_theme(theme);
                            output.info(&format!("Theme: {theme}"));
                        }
                        Some(WatchCommand::Rerender) => {
                            preview.rerender();
                            output.info("Re-rendering diagrams");
                        }
                        None => {}
                    }
                }
                _ = tick.tick() => {
                    if preview.poll() {
                        page.write(&preview).await?;
                        if !preview.has_pending() {
                            report_diagrams(&preview, &output);
                        }
                    }
                }
            }
        }

        output.info("Stopped watching");
        Ok(())
    }
}

/// Interactive command read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchCommand {
    ToggleTheme,
    Rerender,
}

impl WatchCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "t" | "theme" => Some(Self::ToggleTheme),
            "r" | "rerender" => Some(Self::Rerender),
            _ => None,
        }
    }
}

/// Output page for the current preview.
struct Page {
    paginator: PrintHtmlPaginator,
    geometry: PageGeometry,
    path: PathBuf,
}

impl Page {
    async fn write<R: DiagramRenderer>(&self, preview: &Preview<R>) -> Result<(), CliError> {
        let html = self.paginator.document(&preview.to_html(), &self.geometry);
        tokio::fs::write(&self.path, html).await?;
        tracing::debug!(path = %self.path.display(), pending = preview.has_pending(), "Preview written");
        Ok(())
    }
}

/// Directory holding the watched file.
fn watch_dir(input: &Path) -> &Path {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Whether an event creates, modifies or removes the named file.
fn is_change_to(event: &notify::Event, file_name: Option<&OsStr>) -> bool {
    let relevant = matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    );
    relevant
        && event
            .paths
            .iter()
            .any(|path| path.file_name().is_some_and(|name| Some(name) == file_name))
}
