//! Rendering context passed explicitly to every diagram render.

use std::fmt;

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name (`light` or `dark`, case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Mermaid theme name for this theme.
    #[must_use]
    pub fn mermaid_theme(self) -> &'static str {
        match self {
            Self::Light => "neutral",
            Self::Dark => "dark",
        }
    }

    /// The other theme.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security mode for rendering untrusted diagram sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMode {
    /// Scripts, click handlers and raw HTML labels are disabled.
    #[default]
    Sandboxed,
}

impl SecurityMode {
    /// Mermaid `securityLevel` used for server-side SVG rendering.
    #[must_use]
    pub fn mermaid_level(self) -> &'static str {
        match self {
            Self::Sandboxed => "strict",
        }
    }
}

/// Flowchart layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutOptions {
    /// Let diagrams shrink to the container width.
    pub use_max_width: bool,
    /// Render node labels as HTML.
    pub html_labels: bool,
    /// Edge interpolation curve.
    pub curve: &'static str,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            use_max_width: true,
            html_labels: true,
            curve: "basis",
        }
    }
}

/// Everything a diagram render depends on besides its source.
///
/// Visual style is baked into rendered markup, so a change of context
/// invalidates every rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderContext {
    pub theme: Theme,
    pub security: SecurityMode,
    pub layout: LayoutOptions,
}

impl RenderContext {
    /// Default context with the given theme.
    #[must_use]
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    /// Mermaid `%%{init: ...}%%` directive carrying this context.
    #[must_use]
    pub fn init_directive(&self) -> String {
        format!(
            concat!(
                r#"%%{{init: {{"theme": "{}", "securityLevel": "{}", "#,
                r#""flowchart": {{"useMaxWidth": {}, "htmlLabels": {}, "curve": "{}"}}}}}}%%"#
            ),
            self.theme.mermaid_theme(),
            self.security.mermaid_level(),
            self.layout.use_max_width,
            self.layout.html_labels,
            self.layout.curve,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("Light"), Some(Theme::Light));
        assert_eq!(Theme::parse("sepia"), None);
    }

    #[test]
    fn test_mermaid_theme_names() {
        assert_eq!(Theme::Light.mermaid_theme(), "neutral");
        assert_eq!(Theme::Dark.mermaid_theme(), "dark");
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[test]
    fn test_init_directive() {
        let directive = RenderContext::with_theme(Theme::Dark).init_directive();
        assert_eq!(
            directive,
            r#"%%{init: {"theme": "dark", "securityLevel": "strict", "flowchart": {"useMaxWidth": true, "htmlLabels": true, "curve": "basis"}}}%%"#
        );
    }

    #[test]
    fn test_contexts_differ_by_theme() {
        assert_ne!(
            RenderContext::with_theme(Theme::Light),
            RenderContext::with_theme(Theme::Dark)
        );
    }
}
