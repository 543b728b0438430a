//! Declarative style mapping for prose elements.
//!
//! [`StyleMap`] assigns a [`StyleRule`] to every [`ElementKind`]. The map is
//! total by construction: it is backed by an array indexed by kind, so a rule
//! exists for anything the markup renderer can produce.

use crate::node::ElementKind;

/// Presentation rule for one element kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleRule {
    /// Space-separated presentation classes.
    pub class: String,
}

impl StyleRule {
    /// Create a rule from a class list.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

/// Total mapping from element kind to presentation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMap {
    rules: [StyleRule; ElementKind::COUNT],
}

impl Default for StyleMap {
    fn default() -> Self {
        Self {
            rules: ElementKind::ALL.map(|kind| StyleRule::new(default_class(kind))),
        }
    }
}

impl StyleMap {
    /// Create a map where every kind has an empty rule.
    #[must_use]
    pub fn unstyled() -> Self {
        Self {
            rules: ElementKind::ALL.map(|_| StyleRule::default()),
        }
    }

    /// Rule for an element kind.
    #[must_use]
    pub fn rule(&self, kind: ElementKind) -> &StyleRule {
        &self.rules[kind as usize]
    }

    /// Class list for an element kind.
    #[must_use]
    pub fn class(&self, kind: ElementKind) -> &str {
        &self.rule(kind).class
    }

    /// Replace the rule for an element kind.
    pub fn set(&mut self, kind: ElementKind, rule: StyleRule) {
        self.rules[kind as usize] = rule;
    }

    /// Apply overrides keyed by element name (`h1`, `p`, `code`, ...).
    ///
    /// Returns warnings for names that do not match any element kind; those
    /// entries are ignored.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut warnings = Vec::new();
        for (name, class) in overrides {
            match ElementKind::parse(name) {
                Some(kind) => self.set(kind, StyleRule::new(class)),
                None => warnings.push(format!(
                    "unknown style element '{name}' ignored (valid: {})",
                    ElementKind::ALL.map(ElementKind::name).join(", ")
                )),
            }
        }
        warnings
    }
}

/// Built-in presentation classes.
fn default_class(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Prose => "prose dark:prose-invert max-w-none text-gray-800 dark:text-gray-200",
        ElementKind::Heading1 => "text-2xl font-bold mt-6 mb-4 text-gray-900 dark:text-white",
        ElementKind::Heading2 => "text-xl font-bold mt-5 mb-3 text-gray-900 dark:text-white",
        ElementKind::Heading3 => "text-lg font-bold mt-4 mb-2 text-gray-900 dark:text-white",
        ElementKind::Heading4 => "text-base font-bold mt-4 mb-2 text-gray-900 dark:text-white",
        ElementKind::Heading5 => "text-sm font-bold mt-4 mb-2 text-gray-900 dark:text-white",
        ElementKind::Heading6 => "text-xs font-bold mt-4 mb-2 text-gray-900 dark:text-white",
        ElementKind::Paragraph => "mb-4 text-gray-800 dark:text-gray-200",
        ElementKind::OrderedList => "list-decimal pl-6 mb-4",
        ElementKind::UnorderedList => "list-disc pl-6 mb-4",
        ElementKind::ListItem => "mb-1",
        ElementKind::InlineCode => {
            "px-1 py-0.5 rounded bg-gray-100 dark:bg-gray-700 text-gray-800 dark:text-gray-200"
        }
        ElementKind::CodeBlock => "p-4 rounded-md bg-gray-100 dark:bg-gray-700 overflow-auto",
        ElementKind::BlockQuote => "border-l-4 border-gray-300 pl-4 italic mb-4",
        ElementKind::Link => "text-blue-600 dark:text-blue-400 underline",
        ElementKind::Image => "max-w-full",
        ElementKind::Table => "table-auto border-collapse mb-4",
        ElementKind::TableHeaderCell => "border px-2 py-1 font-semibold",
        ElementKind::TableCell => "border px-2 py-1",
        ElementKind::Rule => "my-6 border-gray-300",
        ElementKind::TaskMarker => "mr-2",
        ElementKind::Emphasis
        | ElementKind::Strong
        | ElementKind::Strikethrough
        | ElementKind::TableHead
        | ElementKind::TableRow
        | ElementKind::LineBreak => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_map_covers_required_kinds() {
        let styles = StyleMap::default();
        let required = [
            ElementKind::Heading1,
            ElementKind::Heading2,
            ElementKind::Heading3,
            ElementKind::Heading4,
            ElementKind::Heading5,
            ElementKind::Heading6,
            ElementKind::Paragraph,
            ElementKind::OrderedList,
            ElementKind::UnorderedList,
            ElementKind::ListItem,
            ElementKind::InlineCode,
            ElementKind::CodeBlock,
        ];
        for kind in required {
            assert!(!styles.class(kind).is_empty(), "no rule for {kind:?}");
        }
    }

    #[test]
    fn test_every_kind_has_a_rule() {
        let styles = StyleMap::default();
        for kind in ElementKind::ALL {
            // Indexing must not panic for any kind.
            let _ = styles.rule(kind);
        }
    }

    #[test]
    fn test_overrides_replace_rules() {
        let mut styles = StyleMap::default();
        let warnings = styles.apply_overrides([("h1", "title"), ("p", "")]);

        assert!(warnings.is_empty());
        assert_eq!(styles.class(ElementKind::Heading1), "title");
        assert_eq!(styles.class(ElementKind::Paragraph), "");
        assert_eq!(
            styles.class(ElementKind::ListItem),
            StyleMap::default().class(ElementKind::ListItem)
        );
    }

    #[test]
    fn test_unknown_override_warns() {
        let mut styles = StyleMap::default();
        let warnings = styles.apply_overrides([("heading", "x")]);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'heading'"));
        assert_eq!(styles, StyleMap::default());
    }

    #[test]
    fn test_unstyled_is_empty() {
        let styles = StyleMap::unstyled();
        assert!(ElementKind::ALL.iter().all(|k| styles.class(*k).is_empty()));
    }
}
