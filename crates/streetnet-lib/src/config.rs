//! Network configuration: which road classes are routable and how fast they are.
//!
//! A configuration must be loaded before building a network or loading a
//! persisted one, and both sides of a save/load round trip must use the same
//! defaults. Speeds are re-derived from tags on load, so a changed default
//! silently changes the loaded network.
//!
//! Two document formats are accepted:
//!
//! ```text
//! JSON: {"max_speed": 130, "highways": [{"type": "residential", "maxspeed": 50}]}
//!
//! XML:  <NetworkConfig>
//!         <MaxSpeed value="130"/>
//!         <HighwayFilter>
//!           <Entry type="residential" maxspeed="50"/>
//!         </HighwayFilter>
//!       </NetworkConfig>
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::osm::{required, DocumentShape};

/// Routable road classes, their default speeds, and the global speed fallback.
///
/// Speeds are in km/h.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    max_speed: f64,
    highway_speeds: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    max_speed: f64,
    #[serde(default)]
    highways: Vec<HighwayEntry>,
}

#[derive(Debug, Deserialize)]
struct HighwayEntry {
    #[serde(rename = "type")]
    kind: String,
    maxspeed: f64,
}

impl NetworkConfig {
    /// Create a configuration with no eligible classifications.
    pub fn new(max_speed: f64) -> Result<Self> {
        validate_speed("max_speed", max_speed)?;
        Ok(Self {
            max_speed,
            highway_speeds: BTreeMap::new(),
        })
    }

    /// Mark `classification` as routable with the given default speed.
    pub fn with_highway(mut self, classification: impl Into<String>, speed: f64) -> Result<Self> {
        self.add_highway(classification.into(), speed)?;
        Ok(self)
    }

    fn add_highway(&mut self, classification: String, speed: f64) -> Result<()> {
        validate_speed(&classification, speed)?;
        if self.highway_speeds.contains_key(&classification) {
            return Err(Error::config(format!(
                "classification '{classification}' is listed more than once"
            )));
        }
        self.highway_speeds.insert(classification, speed);
        Ok(())
    }

    /// Load a configuration file, using the XML format for `.xml` files and
    /// JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading network configuration");
        let file = File::open(path)?;
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);

        if is_xml {
            Self::from_xml_reader(BufReader::new(file))
        } else {
            Self::from_json_reader(file)
        }
    }

    /// Parse the JSON configuration format.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_reader(reader)
            .map_err(|err| Error::parse(format!("invalid configuration JSON: {err}")))?;

        let mut config = Self::new(document.max_speed)?;
        for entry in document.highways {
            config.add_highway(entry.kind, entry.maxspeed)?;
        }
        Ok(config)
    }

    /// Parse the XML configuration format.
    pub fn from_xml_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut max_speed = None;
        let mut entries = Vec::new();
        let mut in_filter = false;
        let mut shape = DocumentShape::default();

        loop {
            buf.clear();
            let event = reader.read_event_into(&mut buf).map_err(|err| {
                Error::parse(format!("malformed configuration XML: {err}"))
            })?;
            let position = reader.buffer_position();
            let empty = matches!(event, Event::Empty(_));

            match event {
                Event::Eof => {
                    shape.finish(position)?;
                    break;
                }
                Event::Start(element) | Event::Empty(element) => {
                    shape.open(empty, position)?;
                    match element.name().as_ref() {
                        b"MaxSpeed" => {
                            max_speed = Some(required::<f64>(&element, "MaxSpeed", "value")?)
                        }
                        b"HighwayFilter" => in_filter = !empty,
                        b"Entry" if in_filter => {
                            let kind: String = required(&element, "Entry", "type")?;
                            let speed: f64 = required(&element, "Entry", "maxspeed")?;
                            entries.push((kind, speed));
                        }
                        _ => {}
                    }
                }
                Event::End(element) => {
                    shape.close(position)?;
                    if element.name().as_ref() == b"HighwayFilter" {
                        in_filter = false;
                    }
                }
                Event::Text(text) => shape.text(&text, position)?,
                _ => {}
            }
        }

        let max_speed = max_speed
            .ok_or_else(|| Error::parse("configuration is missing the <MaxSpeed> element"))?;
        let mut config = Self::new(max_speed)?;
        for (kind, speed) in entries {
            config.add_highway(kind, speed)?;
        }
        Ok(config)
    }

    /// Global fallback speed, used for `maxspeed=none`.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Default speed for a classification, if it is routable.
    pub fn default_speed(&self, classification: &str) -> Option<f64> {
        self.highway_speeds.get(classification).copied()
    }

    pub fn is_eligible(&self, classification: &str) -> bool {
        self.highway_speeds.contains_key(classification)
    }

    /// Routable classifications with their default speeds.
    pub fn highways(&self) -> impl Iterator<Item = (&str, f64)> {
        self.highway_speeds.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest speed this configuration can assign without an explicit tag.
    pub fn top_speed(&self) -> f64 {
        self.highway_speeds
            .values()
            .copied()
            .fold(self.max_speed, f64::max)
    }
}

fn validate_speed(name: &str, speed: f64) -> Result<()> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!(
            "speed for '{name}' must be a positive number, got {speed}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_document_defines_whitelist_and_defaults() {
        let json = r#"{
            "max_speed": 130,
            "highways": [
                {"type": "residential", "maxspeed": 50},
                {"type": "motorway", "maxspeed": 120}
            ]
        }"#;

        let config = NetworkConfig::from_json_reader(json.as_bytes()).expect("valid config");
        assert_eq!(config.max_speed(), 130.0);
        assert_eq!(config.default_speed("residential"), Some(50.0));
        assert!(config.is_eligible("motorway"));
        assert!(!config.is_eligible("footway"));
        assert_eq!(config.top_speed(), 130.0);
    }

    #[test]
    fn xml_document_matches_json_document() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <NetworkConfig>
              <MaxSpeed value="130.5"/>
              <HighwayFilter>
                <Entry type="residential" maxspeed="50"/>
                <Entry type="motorway" maxspeed="140"/>
              </HighwayFilter>
            </NetworkConfig>"#;

        let config = NetworkConfig::from_xml_reader(xml.as_bytes()).expect("valid config");
        let expected = NetworkConfig::new(130.5)
            .and_then(|c| c.with_highway("residential", 50.0))
            .and_then(|c| c.with_highway("motorway", 140.0))
            .expect("valid config");

        assert_eq!(config, expected);
        assert_eq!(config.top_speed(), 140.0);
    }

    #[test]
    fn xml_without_max_speed_is_a_parse_error() {
        let xml = r#"<NetworkConfig><HighwayFilter/></NetworkConfig>"#;
        let err = NetworkConfig::from_xml_reader(xml.as_bytes()).expect_err("missing MaxSpeed");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn truncated_xml_is_a_parse_error() {
        let xml = r#"<NetworkConfig><MaxSpeed value="130"/><HighwayFilter>"#;
        let err = NetworkConfig::from_xml_reader(xml.as_bytes()).expect_err("unclosed root");
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn xml_with_content_outside_root_is_a_parse_error() {
        for xml in [
            "not xml at all",
            r#"<NetworkConfig><MaxSpeed value="130"/></NetworkConfig><MaxSpeed value="90"/>"#,
        ] {
            let err = NetworkConfig::from_xml_reader(xml.as_bytes()).expect_err("not well-formed");
            assert!(matches!(err, Error::Parse { .. }), "input {xml:?}");
        }
    }

    #[test]
    fn empty_highway_filter_does_not_capture_later_entries() {
        let xml = r#"<NetworkConfig>
              <MaxSpeed value="100"/>
              <HighwayFilter/>
              <Entry type="residential" maxspeed="50"/>
            </NetworkConfig>"#;
        let config = NetworkConfig::from_xml_reader(xml.as_bytes()).expect("valid config");
        assert!(!config.is_eligible("residential"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = NetworkConfig::from_json_reader("{\"max_speed\": ".as_bytes())
            .expect_err("truncated JSON");
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn non_positive_speeds_are_rejected() {
        assert!(matches!(
            NetworkConfig::new(0.0),
            Err(Error::Config { .. })
        ));

        let err = NetworkConfig::new(100.0)
            .and_then(|c| c.with_highway("track", -10.0))
            .expect_err("negative default speed");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn duplicate_classification_is_rejected() {
        let err = NetworkConfig::new(100.0)
            .and_then(|c| c.with_highway("primary", 70.0))
            .and_then(|c| c.with_highway("primary", 80.0))
            .expect_err("duplicate entry");
        assert!(matches!(err, Error::Config { .. }));
    }
}
