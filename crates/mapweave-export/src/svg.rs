//! SVG export serializer.
//!
//! Renders every undirected graph edge as an `M`/`L` subpath of a single
//! `<path>` element, using the [`svg`] crate for document construction,
//! XML escaping, and path data formatting.
//!
//! Map coordinates are usually projected metres with large offsets, and
//! the `svg` crate formats path data at `f32` precision, so coordinates
//! are shifted to the graph's bounding box before formatting. The y axis
//! is flipped so north points up.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text};

use mapweave_core::{BoundingBox, Point, RoadGraph};

/// Fraction of the larger graph extent added around the drawing.
const MARGIN_RATIO: f64 = 0.02;

/// Stroke width as a fraction of the larger graph extent.
const STROKE_RATIO: f64 = 0.001;

/// Metadata to embed in the SVG document.
///
/// When present, a `<title>` and/or `<desc>` element is emitted
/// immediately after the opening `<svg>` tag.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized map configuration, emitted inside `<metadata>` so the
    /// file records the parameters it was built with.
    pub config_json: Option<&'a str>,
}

/// Render `graph` as an SVG document string.
///
/// An empty graph produces a valid document with no `<path>`.
#[must_use]
pub fn to_svg(graph: &RoadGraph, metadata: &SvgMetadata<'_>) -> String {
    let bounds = BoundingBox::from_points(graph.vertices().iter().map(|v| v.point()))
        .unwrap_or(BoundingBox {
            min: Point::new(0.0, 0.0),
            max: Point::new(1.0, 1.0),
        });
    let extent = bounds.width().max(bounds.height()).max(1.0);
    let margin = extent * MARGIN_RATIO;
    let width = 2.0f64.mul_add(margin, bounds.width());
    let height = 2.0f64.mul_add(margin, bounds.height());

    let mut doc = Document::new().set("viewBox", (0.0, 0.0, width, height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("mapweave:config");
        config_el.assign("xmlns:mapweave", "https://github.com/mapweave/mapweave/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let to_view = |p: Point| {
        (
            p.x - bounds.min.x + margin,
            bounds.max.y - p.y + margin,
        )
    };

    let vertices = graph.vertices();
    let mut data = Data::new();
    let mut any = false;
    for (from, to) in graph.undirected_edges() {
        data = data
            .move_to(to_view(vertices[from].point()))
            .line_to(to_view(vertices[to].point()));
        any = true;
    }

    if any {
        let path = Path::new()
            .set("d", data)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", extent * STROKE_RATIO)
            .set("stroke-linecap", "round");
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
