//! SVG post-processing: id scoping and sizing for paginated output.

use std::sync::LazyLock;

use regex::Regex;

/// Opening `<svg ...>` tag.
static SVG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").unwrap());

/// `id="..."` attribute.
static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\sid="([^"]*)""#).unwrap());

/// `width="..."` attribute.
static WIDTH_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\swidth="([^"]*)""#).unwrap());

/// `height="..."` attribute.
static HEIGHT_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sheight="([^"]*)""#).unwrap());

/// `viewBox="min-x min-y width height"` attribute.
static VIEWBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sviewBox="\s*[-\d.]+[\s,]+[-\d.]+[\s,]+([\d.]+)[\s,]+([\d.]+)\s*""#).unwrap()
});

/// `max-width: 523px;` inside a style attribute.
static MAX_WIDTH_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-width:\s*([\d.]+)px;?\s*").unwrap());

/// Empty style attribute left after removing `max-width`.
static EMPTY_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\sstyle="\s*""#).unwrap());

/// Parse a pixel length (`136`, `136px`, `136.5`). Percentages are ignored.
fn parse_px(value: &str) -> Option<f64> {
    value
        .trim()
        .trim_end_matches("px")
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
}

/// Round to two decimals for attribute output.
fn format_px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}

/// Intrinsic size of an SVG root tag.
fn intrinsic_size(tag: &str) -> Option<(f64, f64)> {
    let view_box = VIEWBOX_RE
        .captures(tag)
        .and_then(|c| Some((parse_px(&c[1])?, parse_px(&c[2])?)));

    let width = MAX_WIDTH_STYLE_RE
        .captures(tag)
        .and_then(|c| parse_px(&c[1]))
        .or_else(|| WIDTH_ATTR_RE.captures(tag).and_then(|c| parse_px(&c[1])))
        .or(view_box.map(|(w, _)| w))?;

    let height = HEIGHT_ATTR_RE
        .captures(tag)
        .and_then(|c| parse_px(&c[1]))
        .or(view_box.map(|(w, h)| h * width / w))?;

    Some((width, height))
}

/// Intrinsic size of an SVG in CSS pixels, read from its root tag.
#[must_use]
pub fn svg_size(svg: &str) -> Option<(f64, f64)> {
    SVG_TAG_RE
        .find(svg)
        .and_then(|tag| intrinsic_size(tag.as_str()))
}

/// Give an SVG a document-unique root id.
///
/// Mermaid scopes its `<style>` rules to `#<root id>` and derives marker and
/// gradient ids from it, so every id and `#` reference starting with the old
/// root id is rewritten to start with `id`. A root without an id gets one.
#[must_use]
pub fn scope_svg_ids(svg: &str, id: &str) -> String {
    let Some(tag) = SVG_TAG_RE.find(svg) else {
        return svg.to_owned();
    };

    match ID_ATTR_RE.captures(tag.as_str()).map(|c| c[1].to_owned()) {
        Some(old) if old == id => svg.to_owned(),
        Some(old) if !old.is_empty() => svg
            .replace(&format!("id=\"{old}"), &format!("id=\"{id}"))
            .replace(&format!("#{old}"), &format!("#{id}")),
        _ => {
            let new_tag = ID_ATTR_RE.replace(tag.as_str(), "");
            let new_tag = new_tag.replacen("<svg", &format!(r#"<svg id="{id}""#), 1);
            format!("{}{new_tag}{}", &svg[..tag.start()], &svg[tag.end()..])
        }
    }
}

/// Fit an SVG to at most `max_width` CSS pixels.
///
/// The root element gets explicit `width` and `height` attributes: diagrams
/// wider than `max_width` are scaled down keeping their aspect ratio, smaller
/// ones keep their size. Any `max-width` style is removed. SVGs without a
/// determinable size are returned unchanged.
#[must_use]
pub fn fit_svg_to_width(svg: &str, max_width: f64) -> String {
    let Some(tag) = SVG_TAG_RE.find(svg) else {
        return svg.to_owned();
    };
    let Some((width, height)) = intrinsic_size(tag.as_str()) else {
        return svg.to_owned();
    };

    let (fitted_width, fitted_height) = if width > max_width {
        (max_width, height * max_width / width)
    } else {
        (width, height)
    };

    let new_tag = WIDTH_ATTR_RE.replace(tag.as_str(), "");
    let new_tag = HEIGHT_ATTR_RE.replace(&new_tag, "");
    let new_tag = MAX_WIDTH_STYLE_RE.replace(&new_tag, "");
    let new_tag = EMPTY_STYLE_RE.replace(&new_tag, "");
    let new_tag = new_tag.replacen(
        "<svg",
        &format!(
            r#"<svg width="{}" height="{}""#,
            format_px(fitted_width),
            format_px(fitted_height)
        ),
        1,
    );

    format!(
        "{}{new_tag}{}",
        &svg[..tag.start()],
        &svg[tag.end()..]
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use pretty_assertions::assert_eq;

    /// Shape of a Kroki Mermaid response: fixed root id, scoped styles and
    /// markers derived from the root id.
    const KROKI_SVG: &str = concat!(
        r#"<svg id="container" width="100%" viewBox="0 0 100 50">"#,
        r#"<style>#container .node rect{fill:#fff;}#container .red>*{fill:red;}</style>"#,
        r#"<marker id="container_flowchart-pointEnd"/>"#,
        r#"<path marker-end="url(#container_flowchart-pointEnd)"/>"#,
        "</svg>"
    );

    fn ids(html: &str) -> Vec<String> {
        ID_ATTR_RE
            .captures_iter(html)
            .map(|c| c[1].to_owned())
            .collect()
    }

    #[test]
    fn test_scope_rewrites_root_styles_and_markers() {
        assert_eq!(
            scope_svg_ids(KROKI_SVG, "mermark-7"),
            concat!(
                r#"<svg id="mermark-7" width="100%" viewBox="0 0 100 50">"#,
                r#"<style>#mermark-7 .node rect{fill:#fff;}#mermark-7 .red>*{fill:red;}</style>"#,
                r#"<marker id="mermark-7_flowchart-pointEnd"/>"#,
                r#"<path marker-end="url(#mermark-7_flowchart-pointEnd)"/>"#,
                "</svg>"
            )
        );
    }

    #[test]
    fn test_two_scoped_diagrams_share_no_ids() {
        let first = scope_svg_ids(KROKI_SVG, "mermark-1");
        let second = scope_svg_ids(KROKI_SVG, "mermark-2");
        let page = format!("<div>{first}</div><div>{second}</div>");

        let all = ids(&page);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(unique.len(), all.len());
        assert!(!page.contains("#container"));
        assert!(second.contains("url(#mermark-2_flowchart-pointEnd)"));
    }

    #[test]
    fn test_scope_adds_missing_root_id() {
        assert_eq!(
            scope_svg_ids(r#"<svg width="10"><g id="a"/></svg>"#, "mermark-3"),
            r#"<svg id="mermark-3" width="10"><g id="a"/></svg>"#
        );
        assert_eq!(scope_svg_ids("no svg here", "mermark-3"), "no svg here");
    }

    #[test]
    fn test_scope_same_id_unchanged() {
        let svg = r#"<svg id="mermark-4"><style>#mermark-4{}</style></svg>"#;
        assert_eq!(scope_svg_ids(svg, "mermark-4"), svg);
    }

    #[test]
    fn test_wide_svg_scaled_down() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="500"><g/></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 700.0),
            r#"<svg width="700" height="350" xmlns="http://www.w3.org/2000/svg"><g/></svg>"#
        );
    }

    #[test]
    fn test_narrow_svg_keeps_size() {
        let svg = r#"<svg width="200px" height="100px"></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 700.0),
            r#"<svg width="200" height="100"></svg>"#
        );
    }

    #[test]
    fn test_mermaid_max_width_style() {
        let svg = r#"<svg id="m-1" width="100%" style="max-width: 1400px;" viewBox="0 0 1400 700"><g/></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 700.0),
            r#"<svg width="700" height="350" id="m-1" viewBox="0 0 1400 700"><g/></svg>"#
        );
    }

    #[test]
    fn test_viewbox_only() {
        let svg = r#"<svg viewBox="0 0 300 150"></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 100.0),
            r#"<svg width="100" height="50" viewBox="0 0 300 150"></svg>"#
        );
    }

    #[test]
    fn test_other_style_kept() {
        let svg = r#"<svg style="max-width: 50px; background: white" width="50" height="20"></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 700.0),
            r#"<svg width="50" height="20" style="background: white"></svg>"#
        );
    }

    #[test]
    fn test_unknown_size_unchanged() {
        let svg = r#"<svg width="100%"><g/></svg>"#;
        assert_eq!(fit_svg_to_width(svg, 700.0), svg);
        assert_eq!(fit_svg_to_width("not svg", 700.0), "not svg");
    }

    #[test]
    fn test_only_root_tag_touched() {
        let svg = r#"<svg width="1000" height="100"><rect width="1000" height="100"/></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 500.0),
            r#"<svg width="500" height="50"><rect width="1000" height="100"/></svg>"#
        );
    }

    #[test]
    fn test_fractional_sizes() {
        let svg = r#"<svg width="300" height="100"></svg>"#;
        assert_eq!(
            fit_svg_to_width(svg, 200.0),
            r#"<svg width="200" height="66.67"></svg>"#
        );
    }

    #[test]
    fn test_svg_size() {
        assert_eq!(
            svg_size(r#"<svg width="718.11" height="359.06"></svg>"#),
            Some((718.11, 359.06))
        );
        assert_eq!(
            svg_size(r#"<svg viewBox="0 0 400 100" style="max-width: 200px;"></svg>"#),
            Some((200.0, 50.0))
        );
        assert_eq!(svg_size(r#"<svg width="100%"></svg>"#), None);
    }
}
