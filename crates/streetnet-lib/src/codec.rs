//! Compact on-disk form of a [`StreetNetwork`].
//!
//! Building from a raw OSM extract is slow, so a built network is saved once
//! and reloaded on later runs.
//!
//! # Format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"SNET" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte), currently always 0
//!   - Reserved: 2 bytes
//!   - Waypoint count: u32 LE (4 bytes)
//!   - Relation count: u32 LE (4 bytes)
//!
//! Body:
//!   - postcard-serialized NetworkDocument
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```
//!
//! The document holds three lists: waypoints (id and position), connection
//! infos (a file-local id and the tag set) and relations (source, target and
//! info id). Edges with value-equal tag sets share one info record. Speeds
//! are not stored; they are derived again from the tags on load, so the
//! loading side must use the same [`NetworkConfig`] as the building side.
//!
//! Records are written in ascending id order, so saving the same network
//! twice produces identical bytes.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::graph::{ConnectionInfo, StreetNetwork, Waypoint, WaypointId};
use crate::tags::TagSet;

/// Magic bytes identifying a street network file.
const NETWORK_MAGIC: &[u8; 4] = b"SNET";

/// Current format version.
const NETWORK_VERSION: u8 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 16;

/// Checksum size in bytes (SHA-256).
const CHECKSUM_SIZE: usize = 32;

/// zstd compression level (balanced speed/ratio).
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WaypointRecord {
    id: WaypointId,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InfoRecord {
    id: u32,
    tags: TagSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RelationRecord {
    source: WaypointId,
    target: WaypointId,
    info: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct NetworkDocument {
    waypoints: Vec<WaypointRecord>,
    infos: Vec<InfoRecord>,
    relations: Vec<RelationRecord>,
}

impl NetworkDocument {
    fn from_network(network: &StreetNetwork) -> Self {
        let mut sorted: Vec<&Waypoint> = network.waypoints().collect();
        sorted.sort_by_key(|wp| wp.id());

        let mut info_ids: HashMap<&TagSet, u32> = HashMap::new();
        let mut document = NetworkDocument::default();

        for waypoint in &sorted {
            document.waypoints.push(WaypointRecord {
                id: waypoint.id(),
                lat: waypoint.lat(),
                lon: waypoint.lon(),
            });

            for (target, info) in waypoint.connections() {
                let next_id = info_ids.len() as u32;
                let info_id = *info_ids.entry(info.tags()).or_insert_with(|| {
                    document.infos.push(InfoRecord {
                        id: next_id,
                        tags: info.tags().clone(),
                    });
                    next_id
                });
                document.relations.push(RelationRecord {
                    source: waypoint.id(),
                    target,
                    info: info_id,
                });
            }
        }

        document
    }

    /// Rebuild a network, validating every reference on the way.
    fn into_network(self, config: &NetworkConfig) -> Result<StreetNetwork> {
        let mut network = StreetNetwork::new();

        for record in &self.waypoints {
            if !record.lat.is_finite() || !record.lon.is_finite() {
                return Err(Error::corrupt(format!(
                    "waypoint {} has non-finite coordinates",
                    record.id
                )));
            }
            if network.contains(record.id) {
                return Err(Error::corrupt(format!(
                    "waypoint {} is listed twice",
                    record.id
                )));
            }
            network.waypoint_or_insert(record.id, record.lat, record.lon);
        }

        let mut infos: HashMap<u32, Arc<ConnectionInfo>> = HashMap::with_capacity(self.infos.len());
        for record in self.infos {
            let info = Arc::new(ConnectionInfo::derive(record.tags, config));
            if infos.insert(record.id, info).is_some() {
                return Err(Error::corrupt(format!(
                    "connection info {} is listed twice",
                    record.id
                )));
            }
        }

        for relation in &self.relations {
            if relation.source == relation.target {
                return Err(Error::corrupt(format!(
                    "relation connects waypoint {} to itself",
                    relation.source
                )));
            }
            for id in [relation.source, relation.target] {
                if !network.contains(id) {
                    return Err(Error::corrupt(format!(
                        "relation {} -> {} references unknown waypoint {}",
                        relation.source, relation.target, id
                    )));
                }
            }
            let info = infos.get(&relation.info).ok_or_else(|| {
                Error::corrupt(format!(
                    "relation {} -> {} references unknown connection info {}",
                    relation.source, relation.target, relation.info
                ))
            })?;
            network.connect(relation.source, relation.target, Arc::clone(info));
        }

        Ok(network)
    }
}

/// Write `network` to `writer`.
pub fn save<W: Write>(network: &StreetNetwork, mut writer: W) -> Result<()> {
    let document = NetworkDocument::from_network(network);
    let bytes = encode(&document)?;
    writer.write_all(&bytes)?;
    writer.flush()?;

    info!(
        waypoints = document.waypoints.len(),
        infos = document.infos.len(),
        relations = document.relations.len(),
        bytes = bytes.len(),
        "saved street network"
    );
    Ok(())
}

/// Read a network previously written by [`save`].
///
/// Speeds are derived from the stored tags with `config`. Nothing is returned
/// unless the whole file validates.
pub fn load<R: Read>(mut reader: R, config: &NetworkConfig) -> Result<StreetNetwork> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let document = decode(&bytes)?;
    let network = document.into_network(config)?;

    info!(
        waypoints = network.len(),
        edges = network.edge_count(),
        "loaded street network"
    );
    Ok(network)
}

/// Save `network` to a file, replacing any existing one.
pub fn save_to_path(network: &StreetNetwork, path: &Path) -> Result<()> {
    debug!(path = %path.display(), "saving street network");
    let file = File::create(path)?;
    save(network, BufWriter::new(file))
}

/// Load a network from a file written by [`save_to_path`].
pub fn load_from_path(path: &Path, config: &NetworkConfig) -> Result<StreetNetwork> {
    debug!(path = %path.display(), "loading street network");
    let file = File::open(path)?;
    load(BufReader::new(file), config)
}

fn encode(document: &NetworkDocument) -> Result<Vec<u8>> {
    let serialized = postcard::to_allocvec(document).map_err(|e| Error::Serialize {
        message: format!("postcard serialization failed: {e}"),
    })?;

    let compressed =
        zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
            Error::Serialize {
                message: format!("zstd compression failed: {e}"),
            }
        })?;

    let checksum = Sha256::digest(&compressed);

    let waypoint_count = count(document.waypoints.len(), "waypoints")?;
    let relation_count = count(document.relations.len(), "relations")?;

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(NETWORK_MAGIC);
    header[4] = NETWORK_VERSION;
    header[5] = 0;
    // bytes 6-7 reserved
    header[8..12].copy_from_slice(&waypoint_count.to_le_bytes());
    header[12..16].copy_from_slice(&relation_count.to_le_bytes());

    let mut bytes = Vec::with_capacity(HEADER_SIZE + compressed.len() + CHECKSUM_SIZE);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&compressed);
    bytes.extend_from_slice(&checksum);
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<NetworkDocument> {
    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(Error::corrupt(format!(
            "file is too short ({} bytes)",
            bytes.len()
        )));
    }

    let (header, rest) = bytes.split_at(HEADER_SIZE);
    let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);

    if &header[0..4] != NETWORK_MAGIC {
        return Err(Error::corrupt("invalid magic bytes"));
    }
    let version = header[4];
    if version != NETWORK_VERSION {
        return Err(Error::corrupt(format!(
            "unsupported version {} (expected {})",
            version, NETWORK_VERSION
        )));
    }
    let waypoint_count = read_u32(&header[8..12]);
    let relation_count = read_u32(&header[12..16]);

    let computed_checksum = Sha256::digest(compressed);
    if computed_checksum.as_slice() != stored_checksum {
        return Err(Error::corrupt(
            "checksum mismatch - file may be corrupted",
        ));
    }

    let serialized = zstd::decode_all(compressed)
        .map_err(|e| Error::corrupt(format!("zstd decompression failed: {e}")))?;
    let document: NetworkDocument = postcard::from_bytes(&serialized)
        .map_err(|e| Error::corrupt(format!("postcard deserialization failed: {e}")))?;

    if document.waypoints.len() != waypoint_count as usize
        || document.relations.len() != relation_count as usize
    {
        return Err(Error::corrupt(format!(
            "header declares {} waypoints and {} relations but body has {} and {}",
            waypoint_count,
            relation_count,
            document.waypoints.len(),
            document.relations.len()
        )));
    }

    Ok(document)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

fn count(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Serialize {
        message: format!("too many {what} for the file format ({len})"),
    })
}
