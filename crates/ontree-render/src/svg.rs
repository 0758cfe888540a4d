//! Static SVG and standalone HTML output of a settled diagram.

use crate::config::DiagramConfig;
use crate::encoding::{
    diagonal_path, js_number, label_placement, node_fill, node_radius, tooltip_lines,
};
use crate::layout::TreeLayout;
use crate::reconcile::LinkPath;
use crate::view::ViewTransform;
use htmlize::{escape_attribute, escape_text};
use ontree_core::Ontology;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct SvgOptions {
    pub transform: ViewTransform,
    /// Solid backdrop; `None` leaves the canvas transparent.
    pub background: Option<String>,
    /// Emit a `<title>` per node carrying the tooltip text.
    pub tooltips: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            transform: ViewTransform::default(),
            background: None,
            tooltips: true,
        }
    }
}

/// Transform that fits the whole layout into the viewport, never zooming in past 1.
pub fn fit_transform(layout: &TreeLayout, config: &DiagramConfig) -> ViewTransform {
    let Some(b) = layout.bounds() else {
        return ViewTransform::default();
    };
    // Labels hang off both sides of the node column; the depth step bounds their length.
    let pad_x = layout.depth_step.max(config.label_offset) + config.max_radius;
    let pad_y = config.max_radius + config.label_offset;
    let width = b.max.x - b.min.x + 2.0 * pad_x;
    let height = b.max.y - b.min.y + 2.0 * pad_y;
    let scale = (config.viewport_width / width)
        .min(config.viewport_height / height)
        .min(1.0)
        .max(config.min_zoom);
    let cx = (b.min.x + b.max.x) / 2.0;
    let cy = (b.min.y + b.max.y) / 2.0;
    ViewTransform {
        translate_x: config.viewport_width / 2.0 - cx * scale,
        translate_y: config.viewport_height / 2.0 - cy * scale,
        scale,
    }
}

pub fn stylesheet(config: &DiagramConfig) -> String {
    let p = &config.palette;
    format!(
        ".node {{ cursor: pointer; }}
.node circle {{ stroke: {stroke}; stroke-width: 1.5px; }}
.node text {{ font-size: 10px; font-family: sans-serif; fill: {text}; }}
.link {{ fill: none; stroke: {link}; stroke-width: 1.5px; }}
.templink {{ fill: none; stroke: {temp}; stroke-width: 1px; stroke-dasharray: 3, 3; opacity: 0.5; }}
.ghostCircle {{ display: none; }}
.ghostCircle.show {{ display: block; }}
",
        stroke = p.node_stroke,
        text = p.text,
        link = p.link,
        temp = p.temp_link,
    )
}

/// Draws every node of `layout` at its final position.
pub fn render_svg(
    ontology: &Ontology,
    layout: &TreeLayout,
    config: &DiagramConfig,
    options: &SvgOptions,
) -> String {
    let w = js_number(config.viewport_width);
    let h = js_number(config.viewport_height);
    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="overlay" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(&mut out, "<style>{}</style>", stylesheet(config));
    if let Some(bg) = &options.background {
        let _ = write!(
            &mut out,
            r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}"/>"#,
            escape_attribute(bg.as_str())
        );
    }

    let t = &options.transform;
    let _ = write!(
        &mut out,
        r#"<g transform="translate({},{})scale({})">"#,
        js_number(t.translate_x),
        js_number(t.translate_y),
        js_number(t.scale)
    );

    for link in &layout.links {
        let (Some(s), Some(tgt)) = (layout.position(link.source), layout.position(link.target))
        else {
            continue;
        };
        let _ = write!(
            &mut out,
            r#"<path class="link" data-target="{}" d="{}"/>"#,
            link.target.index(),
            diagonal_path(&LinkPath::new(s, tgt))
        );
    }

    for placement in &layout.nodes {
        let node = &ontology[placement.id];
        let label = label_placement(node, config);
        let _ = write!(
            &mut out,
            r#"<g class="node" data-id="{}" transform="translate({},{})">"#,
            placement.id.index(),
            js_number(placement.x),
            js_number(placement.y)
        );
        let _ = write!(
            &mut out,
            r#"<circle class="nodeCircle" r="{}" fill="{}"/>"#,
            js_number(node_radius(&node.stats(), config)),
            escape_attribute(node_fill(node, config))
        );
        let _ = write!(
            &mut out,
            r#"<text class="nodeText" x="{}" dy=".35em" text-anchor="{}">{}</text>"#,
            js_number(label.x),
            label.anchor.as_str(),
            escape_text(node.name())
        );
        if options.tooltips {
            let _ = write!(
                &mut out,
                "<title>{}</title>",
                escape_text(tooltip_lines(node).join("\n"))
            );
        }
        out.push_str("</g>");
    }

    out.push_str("</g></svg>");
    out
}

/// Self-contained page embedding the SVG.
pub fn render_html(
    ontology: &Ontology,
    layout: &TreeLayout,
    config: &DiagramConfig,
    options: &SvgOptions,
    title: &str,
) -> String {
    let svg = render_svg(ontology, layout, config, options);
    let mut out = String::new();
    let _ = write!(
        &mut out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>body {{ margin: 0; background: {}; }} #tree-container {{ overflow: hidden; }}</style>\n\
         </head>\n<body>\n<div id=\"tree-container\">{}</div>\n</body>\n</html>\n",
        escape_text(title),
        escape_text(config.palette.background.as_str()),
        svg
    );
    out
}
