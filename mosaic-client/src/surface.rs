//! Output surface for rendered tiles
//!
//! Tile fragments are small SVG documents. Each one is parsed into an owned
//! [`TileNode`] tree, positioned with `x`/`y` attributes and appended to a
//! [`MosaicSurface`]. [`SvgDocument`] is the surface used by the CLI; tests
//! plug in their own.

use std::fmt::Write as _;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Drawing surface receiving positioned tiles in row-major, column order
pub trait MosaicSurface {
    /// Called once per run, before any tile, with the source image size
    fn set_view_box(&mut self, width: u32, height: u32);

    fn append_tile(&mut self, tile: TileNode);
}

/// Child of a parsed element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileChild {
    Element(TileNode),
    Text(String),
}

/// Owned element tree parsed from one tile fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileNode {
    name: String,
    namespace: Option<String>,
    /// Prefixed namespaces declared on this element (`xmlns:prefix`)
    declarations: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
    children: Vec<TileChild>,
}

impl TileNode {
    /// Parse a fragment into its root element
    ///
    /// Returns the parser's message on failure; the caller attaches the tile
    /// coordinates.
    pub fn parse(fragment: &str) -> std::result::Result<Self, String> {
        let document = roxmltree::Document::parse(fragment).map_err(|e| e.to_string())?;
        Ok(Self::from_element(document.root_element()))
    }

    fn from_element(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|attr| {
                let name = match attr.namespace() {
                    Some(XML_NS) => format!("xml:{}", attr.name()),
                    Some(uri) => match node.lookup_prefix(uri) {
                        Some(prefix) => format!("{}:{}", prefix, attr.name()),
                        None => attr.name().to_string(),
                    },
                    None => attr.name().to_string(),
                };
                (name, attr.value().to_string())
            })
            .collect();

        let parent_scope: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        let declarations = node
            .namespaces()
            .filter_map(|ns| ns.name().map(|prefix| (prefix, ns.uri())))
            .filter(|(prefix, uri)| {
                *prefix != "xml" && !parent_scope.contains(&(Some(*prefix), *uri))
            })
            .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
            .collect();

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(TileChild::Element(Self::from_element(child)))
                } else if child.is_text() {
                    child.text().map(|t| TileChild::Text(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            name: node.tag_name().name().to_string(),
            namespace: node.tag_name().namespace().map(str::to_string),
            declarations,
            attributes,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value in place
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn children(&self) -> &[TileChild] {
        &self.children
    }

    /// Serialize under a parent whose default namespace is `parent_ns`
    pub fn write_markup(&self, out: &mut String, parent_ns: Option<&str>) {
        out.push('<');
        out.push_str(&self.name);
        if self.namespace.as_deref() != parent_ns {
            let _ = write!(
                out,
                " xmlns=\"{}\"",
                escape(self.namespace.as_deref().unwrap_or(""))
            );
        }
        for (prefix, uri) in &self.declarations {
            let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape(uri));
        }
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape(value));
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                TileChild::Element(node) => node.write_markup(out, self.namespace.as_deref()),
                TileChild::Text(text) => out.push_str(&escape(text)),
            }
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// In-memory SVG document, serialized on demand
#[derive(Debug, Default)]
pub struct SvgDocument {
    view_box: Option<(u32, u32)>,
    tiles: Vec<TileNode>,
}

impl SvgDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_box(&self) -> Option<(u32, u32)> {
        self.view_box
    }

    pub fn tiles(&self) -> &[TileNode] {
        &self.tiles
    }

    /// Full document with every appended tile, in append order
    pub fn to_svg_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = write!(
            out,
            "<svg xmlns=\"{}\" xmlns:xlink=\"{}\"",
            SVG_NS, XLINK_NS
        );
        if let Some((width, height)) = self.view_box {
            let _ = write!(out, " viewBox=\"0 0 {} {}\"", width, height);
        }
        out.push_str(">\n");
        for tile in &self.tiles {
            tile.write_markup(&mut out, Some(SVG_NS));
            out.push('\n');
        }
        out.push_str("</svg>\n");
        out
    }
}

impl MosaicSurface for SvgDocument {
    fn set_view_box(&mut self, width: u32, height: u32) {
        self.view_box = Some((width, height));
    }

    fn append_tile(&mut self, tile: TileNode) {
        self.tiles.push(tile);
    }
}
