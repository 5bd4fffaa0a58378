//! Streaming reader for OpenStreetMap XML extracts.
//!
//! The reader walks the document event by event with `quick-xml` and yields
//! one [`OsmElement`] per `<node>` or `<way>`, so callers never hold more than
//! a single element of the raw document in memory. Unrecognised elements
//! (`<bounds>`, `<relation>`, `<meta>`, ...) and their children are skipped.
//!
//! [`RawMap`] collects the whole stream into node and way tables with way
//! references resolved to node objects. For large extracts prefer feeding the
//! stream straight into [`crate::builder::build_network_streaming`].

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tags::TagSet;

/// Identifier of a raw OSM node.
pub type RawNodeId = i64;

/// Identifier of a raw OSM way.
pub type RawWayId = i64;

/// Node as parsed from the raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: RawNodeId,
    pub lat: f64,
    pub lon: f64,
    pub tags: TagSet,
}

/// Way with its node references resolved to parsed nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: RawWayId,
    pub nodes: Vec<Arc<RawNode>>,
    pub tags: TagSet,
}

/// Way as it appears in the document, before node references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct WayRecord {
    pub id: RawWayId,
    pub node_refs: Vec<RawNodeId>,
    pub tags: TagSet,
}

impl WayRecord {
    /// Resolve node references against a node table.
    pub fn resolve(self, nodes: &HashMap<RawNodeId, Arc<RawNode>>) -> Result<RawWay> {
        let resolved = self
            .node_refs
            .iter()
            .map(|node_ref| {
                nodes.get(node_ref).cloned().ok_or_else(|| {
                    Error::parse(format!(
                        "way {} references unknown node {}",
                        self.id, node_ref
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RawWay {
            id: self.id,
            nodes: resolved,
            tags: self.tags,
        })
    }
}

/// Element yielded by [`OsmReader`].
#[derive(Debug, Clone, PartialEq)]
pub enum OsmElement {
    Node(RawNode),
    Way(WayRecord),
}

/// Element currently being assembled from child events.
enum Open {
    Node(RawNode),
    Way(WayRecord),
}

/// Element nesting of an XML document, used to reject documents that are not
/// well-formed: no root, text or elements outside the root, or a root that is
/// never closed.
#[derive(Debug, Default)]
pub(crate) struct DocumentShape {
    depth: usize,
    root_seen: bool,
    root_closed: bool,
}

impl DocumentShape {
    /// Record a start tag, or an empty-element tag when `empty` is set.
    pub(crate) fn open(&mut self, empty: bool, position: usize) -> Result<()> {
        if self.root_closed {
            return Err(Error::parse(format!(
                "element after the end of the root element at byte {position}"
            )));
        }
        self.root_seen = true;
        if empty {
            self.root_closed |= self.depth == 0;
        } else {
            self.depth += 1;
        }
        Ok(())
    }

    pub(crate) fn close(&mut self, position: usize) -> Result<()> {
        self.depth = self.depth.checked_sub(1).ok_or_else(|| {
            Error::parse(format!("unexpected end tag at byte {position}"))
        })?;
        self.root_closed |= self.depth == 0;
        Ok(())
    }

    /// Character data is only allowed inside the root element.
    pub(crate) fn text(&self, content: &[u8], position: usize) -> Result<()> {
        let outside_root = self.depth == 0;
        if outside_root && content.iter().any(|b| !b.is_ascii_whitespace()) {
            return Err(Error::parse(format!(
                "text outside the root element at byte {position}"
            )));
        }
        Ok(())
    }

    pub(crate) fn finish(&self, position: usize) -> Result<()> {
        if !self.root_seen {
            return Err(Error::parse("document has no root element"));
        }
        if self.depth != 0 {
            return Err(Error::parse(format!(
                "document ended inside an unclosed element at byte {position}"
            )));
        }
        Ok(())
    }
}

/// Incremental reader over an OSM XML document.
pub struct OsmReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    shape: DocumentShape,
    done: bool,
}

impl OsmReader<BufReader<File>> {
    /// Open an OSM XML file for streaming.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> OsmReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            shape: DocumentShape::default(),
            done: false,
        }
    }

    fn next_element(&mut self) -> Result<Option<OsmElement>> {
        let mut open: Option<Open> = None;

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    return Err(Error::parse(format!(
                        "malformed XML near byte {}: {err}",
                        self.reader.buffer_position()
                    )))
                }
            };

            let position = self.reader.buffer_position();
            match event {
                Event::Eof => {
                    self.shape.finish(position)?;
                    return Ok(None);
                }
                Event::Start(element) => {
                    self.shape.open(false, position)?;
                    match open.as_mut() {
                        None => match element.name().as_ref() {
                            b"node" => open = Some(Open::Node(parse_node(&element)?)),
                            b"way" => open = Some(Open::Way(parse_way(&element)?)),
                            _ => {}
                        },
                        Some(current) => apply_child(current, &element)?,
                    }
                }
                Event::Empty(element) => {
                    self.shape.open(true, position)?;
                    match open.as_mut() {
                        None => match element.name().as_ref() {
                            b"node" => {
                                return parse_node(&element).map(|n| Some(OsmElement::Node(n)))
                            }
                            b"way" => return parse_way(&element).map(|w| Some(OsmElement::Way(w))),
                            _ => {}
                        },
                        Some(current) => apply_child(current, &element)?,
                    }
                }
                Event::End(element) => {
                    self.shape.close(position)?;
                    let closes_open = matches!(
                        (&open, element.name().as_ref()),
                        (Some(Open::Node(_)), b"node") | (Some(Open::Way(_)), b"way")
                    );
                    if closes_open {
                        return Ok(open.take().map(|finished| match finished {
                            Open::Node(node) => OsmElement::Node(node),
                            Open::Way(way) => OsmElement::Way(way),
                        }));
                    }
                }
                Event::Text(text) => self.shape.text(&text, position)?,
                Event::CData(data) => self.shape.text(&data, position)?,
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmReader<R> {
    type Item = Result<OsmElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                debug!(
                    position = self.reader.buffer_position(),
                    error = %err,
                    "stopped reading OSM document"
                );
                Some(Err(err))
            }
        }
    }
}

/// Raw node and way tables of a fully parsed document.
#[derive(Debug, Clone, Default)]
pub struct RawMap {
    pub nodes: HashMap<RawNodeId, Arc<RawNode>>,
    pub ways: HashMap<RawWayId, RawWay>,
}

impl RawMap {
    /// Parse an OSM XML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading raw map");
        Self::from_elements(OsmReader::from_path(path)?)
    }

    /// Parse an OSM XML document from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_elements(OsmReader::new(reader))
    }

    fn from_elements<R: BufRead>(elements: OsmReader<R>) -> Result<Self> {
        let mut nodes = HashMap::new();
        let mut pending = Vec::new();

        for element in elements {
            match element? {
                OsmElement::Node(node) => {
                    let id = node.id;
                    if nodes.insert(id, Arc::new(node)).is_some() {
                        warn!(
                            node = id,
                            "duplicate node id in raw map; keeping the last definition"
                        );
                    }
                }
                OsmElement::Way(way) => pending.push(way),
            }
        }

        // Ways are resolved once every node is known, so document order does not matter here.
        let mut ways = HashMap::with_capacity(pending.len());
        for record in pending {
            let way = record.resolve(&nodes)?;
            ways.insert(way.id, way);
        }

        info!(nodes = nodes.len(), ways = ways.len(), "parsed raw map");
        Ok(Self { nodes, ways })
    }
}

fn apply_child(current: &mut Open, element: &BytesStart<'_>) -> Result<()> {
    match (current, element.name().as_ref()) {
        (Open::Node(node), b"tag") => add_tag(&mut node.tags, element),
        (Open::Way(way), b"tag") => add_tag(&mut way.tags, element),
        (Open::Way(way), b"nd") => {
            way.node_refs.push(required(element, "nd", "ref")?);
            Ok(())
        }
        (_, b"node") | (_, b"way") => Err(Error::parse(
            "nested <node> or <way> elements are not allowed",
        )),
        _ => Ok(()),
    }
}

fn parse_node(element: &BytesStart<'_>) -> Result<RawNode> {
    let id = required(element, "node", "id")?;
    let lat: f64 = required(element, "node", "lat")?;
    let lon: f64 = required(element, "node", "lon")?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(Error::parse(format!(
            "node {id} has non-finite coordinates ({lat}, {lon})"
        )));
    }

    Ok(RawNode {
        id,
        lat,
        lon,
        tags: TagSet::new(),
    })
}

fn parse_way(element: &BytesStart<'_>) -> Result<WayRecord> {
    Ok(WayRecord {
        id: required(element, "way", "id")?,
        node_refs: Vec::new(),
        tags: TagSet::new(),
    })
}

fn add_tag(tags: &mut TagSet, element: &BytesStart<'_>) -> Result<()> {
    let key = attribute(element, "k")?.unwrap_or_default();
    if key.is_empty() {
        return Ok(());
    }
    let value = attribute(element, "v")?.unwrap_or_default();
    tags.insert(key, value);
    Ok(())
}

/// Read and unescape a single attribute value.
pub(crate) fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|err| Error::parse(format!("invalid attribute: {err}")))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::parse(format!("invalid value for '{name}': {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Read a mandatory attribute and parse it with Rust's locale-independent parsers.
pub(crate) fn required<T>(element: &BytesStart<'_>, tag: &str, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = attribute(element, name)?
        .ok_or_else(|| Error::parse(format!("<{tag}> is missing attribute '{name}'")))?;
    raw.trim().parse().map_err(|err| {
        Error::parse(format!(
            "<{tag}> attribute '{name}' has invalid value '{raw}': {err}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(xml: &str) -> Result<Vec<OsmElement>> {
        OsmReader::new(xml.as_bytes()).collect()
    }

    #[test]
    fn reads_nodes_with_and_without_tags() {
        let xml = r#"<?xml version="1.0"?>
            <osm version="0.6">
              <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
              <node id="1" lat="52.5" lon="13.4"/>
              <node id="2" lat="-0.25" lon="1e-3" version="3">
                <tag k="amenity" v="pub"/>
              </node>
            </osm>"#;

        let elements = read_all(xml).expect("valid document");
        assert_eq!(elements.len(), 2);

        let OsmElement::Node(first) = &elements[0] else {
            panic!("expected node");
        };
        assert_eq!(first.id, 1);
        assert_eq!(first.lat, 52.5);
        assert!(first.tags.is_empty());

        let OsmElement::Node(second) = &elements[1] else {
            panic!("expected node");
        };
        assert_eq!(second.lat, -0.25);
        assert_eq!(second.lon, 0.001);
        assert_eq!(second.tags.get("amenity"), Some("pub"));
    }

    #[test]
    fn reads_way_references_in_order() {
        let xml = r#"<osm>
              <way id="10">
                <nd ref="3"/><nd ref="1"/><nd ref="2"/>
                <tag k="highway" v="residential"/>
                <tag k="name" v="Foo &amp; Bar"/>
              </way>
            </osm>"#;

        let elements = read_all(xml).expect("valid document");
        let OsmElement::Way(way) = &elements[0] else {
            panic!("expected way");
        };
        assert_eq!(way.id, 10);
        assert_eq!(way.node_refs, vec![3, 1, 2]);
        assert_eq!(way.tags.get("highway"), Some("residential"));
        assert_eq!(way.tags.get("name"), Some("Foo & Bar"));
    }

    #[test]
    fn relation_tags_are_not_attributed_to_other_elements() {
        let xml = r#"<osm>
              <node id="1" lat="0" lon="0"/>
              <relation id="5">
                <member type="node" ref="1" role=""/>
                <tag k="type" v="restriction"/>
              </relation>
            </osm>"#;

        let elements = read_all(xml).expect("valid document");
        assert_eq!(elements.len(), 1);
        let OsmElement::Node(node) = &elements[0] else {
            panic!("expected node");
        };
        assert!(node.tags.is_empty());
    }

    #[test]
    fn tags_without_key_are_skipped() {
        let xml = r#"<osm><node id="1" lat="0" lon="0"><tag v="x"/><tag k="a"/></node></osm>"#;
        let elements = read_all(xml).expect("valid document");
        let OsmElement::Node(node) = &elements[0] else {
            panic!("expected node");
        };
        assert_eq!(node.tags.len(), 1);
        assert_eq!(node.tags.get("a"), Some(""));
    }

    #[test]
    fn missing_coordinate_is_a_parse_error() {
        let err = read_all(r#"<osm><node id="1" lat="0"/></osm>"#).expect_err("missing lon");
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("lon"));
    }

    #[test]
    fn comma_decimal_separator_is_rejected() {
        let err = read_all(r#"<osm><node id="1" lat="52,5" lon="13.4"/></osm>"#)
            .expect_err("comma is not a decimal separator");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn non_numeric_id_is_a_parse_error() {
        let err = read_all(r#"<osm><way id="abc"/></osm>"#).expect_err("bad id");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let err = read_all(r#"<osm><node id="1" lat="NaN" lon="0"/></osm>"#)
            .expect_err("NaN latitude");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = read_all(r#"<osm><node id="1" lat="0" lon="0"></way></osm>"#)
            .expect_err("mismatched end tag");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let xml = r#"<?xml version="1.0"?><osm><node id="1" lat="0" lon="0"/><node id="2" lat="0" lon="0.001"/>"#;
        let err = RawMap::from_reader(xml.as_bytes()).expect_err("root never closed");
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn document_without_root_is_a_parse_error() {
        for xml in ["", "   \n", r#"<?xml version="1.0"?>"#] {
            let err = read_all(xml).expect_err("no root element");
            assert!(matches!(err, Error::Parse { .. }), "input {xml:?}");
        }
    }

    #[test]
    fn text_outside_root_is_a_parse_error() {
        let err = read_all("hello world").expect_err("plain text");
        assert!(matches!(err, Error::Parse { .. }));

        let err = read_all(r#"<osm><node id="1" lat="0" lon="0"/></osm> trailing"#)
            .expect_err("text after root");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn element_after_root_is_a_parse_error() {
        let xml = r#"<osm><node id="1" lat="0" lon="0"/></osm><node id="2" lat="0" lon="0"/>"#;
        let err = RawMap::from_reader(xml.as_bytes()).expect_err("second top-level element");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn empty_root_element_is_an_empty_map() {
        let map = RawMap::from_reader(r#"<osm version="0.6"/>"#.as_bytes()).expect("valid map");
        assert!(map.nodes.is_empty());
        assert!(map.ways.is_empty());
    }

    #[test]
    fn raw_map_resolves_ways_regardless_of_order() {
        let xml = r#"<osm>
              <way id="7"><nd ref="1"/><nd ref="2"/></way>
              <node id="1" lat="0" lon="0"/>
              <node id="2" lat="0" lon="0.001"/>
            </osm>"#;

        let map = RawMap::from_reader(xml.as_bytes()).expect("valid map");
        assert_eq!(map.nodes.len(), 2);
        let way = &map.ways[&7];
        let ids: Vec<_> = way.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(Arc::ptr_eq(&way.nodes[0], &map.nodes[&1]));
    }

    #[test]
    fn raw_map_rejects_unknown_node_reference() {
        let xml = r#"<osm><node id="1" lat="0" lon="0"/><way id="7"><nd ref="1"/><nd ref="9"/></way></osm>"#;
        let err = RawMap::from_reader(xml.as_bytes()).expect_err("unknown node");
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("unknown node 9"));
    }
}
