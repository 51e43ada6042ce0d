//! Layout text format.
//!
//! ```text
//! nodes:
//! id:0,X:1.5,Y:0,Z:-2,size:1,R:1,G:1,B:1,A:1,name:YAP
//! id:1,size:1,R:0,G:1,B:0,A:1,name:TAZ
//! edges:
//! id1:0,id2:1,length:1,value:0.5,type:+
//! ```
//!
//! A node without a position omits `X`, `Y` and `Z`. Names are written verbatim
//! and must not contain `,`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TopologyError};
use crate::model::{Edge, Node, NodeId};
use crate::topology::Topology;
use crate::{Color, Vec3};

/// Header line opening the node section.
pub const NODES_SECTION: &str = "nodes:";
/// Header line opening the edge section.
pub const EDGES_SECTION: &str = "edges:";

/// One parsed line of the node section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub position: Option<Vec3>,
    pub size: f32,
    pub color: Color,
    pub name: Option<String>,
}

impl NodeRecord {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id,
            position: node.position,
            size: node.size,
            color: node.color,
            name: node.label.clone(),
        }
    }
}

fn write_node<W: Write>(w: &mut W, node: &Node) -> std::io::Result<()> {
    write!(w, "id:{}", node.id.0)?;
    if let Some(p) = node.position {
        write!(w, ",X:{},Y:{},Z:{}", p.x, p.y, p.z)?;
    }
    let c = node.color;
    write!(
        w,
        ",size:{},R:{},G:{},B:{},A:{}",
        node.size, c.r, c.g, c.b, c.a
    )?;
    if let Some(name) = &node.label {
        write!(w, ",name:{name}")?;
    }
    writeln!(w)
}

fn write_edge<W: Write>(w: &mut W, edge: &Edge) -> std::io::Result<()> {
    write!(
        w,
        "id1:{},id2:{},length:{},value:{}",
        edge.end1.0, edge.end2.0, edge.length, edge.value
    )?;
    if let Some(kind) = &edge.kind {
        write!(w, ",type:{}", kind.tag())?;
    }
    writeln!(w)
}

/// Split a `key:value,key:value` record.
fn fields(line: &str, line_no: usize) -> Result<HashMap<&str, &str>> {
    line.split(',')
        .map(|part| {
            part.split_once(':')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| TopologyError::parse(line_no, format!("field without ':' in {part:?}")))
        })
        .collect()
}

fn required<T: std::str::FromStr>(
    map: &HashMap<&str, &str>,
    key: &str,
    line_no: usize,
) -> Result<T> {
    let raw = map
        .get(key)
        .ok_or_else(|| TopologyError::parse(line_no, format!("missing field {key}")))?;
    raw.parse()
        .map_err(|_| TopologyError::parse(line_no, format!("invalid {key}: {raw:?}")))
}

fn optional<T: std::str::FromStr>(
    map: &HashMap<&str, &str>,
    key: &str,
    line_no: usize,
) -> Result<Option<T>> {
    if map.contains_key(key) {
        required(map, key, line_no).map(Some)
    } else {
        Ok(None)
    }
}

/// Node-section lines with their 1-based line numbers.
fn node_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .take_while(|&(_, line)| line != EDGES_SECTION)
        .filter(|&(_, line)| !line.is_empty() && line != NODES_SECTION)
}

fn parse_position(map: &HashMap<&str, &str>, line_no: usize) -> Result<Vec3> {
    Ok(Vec3::new(
        required(map, "X", line_no)?,
        required(map, "Y", line_no)?,
        required(map, "Z", line_no)?,
    ))
}

/// Parse every record of the node section. Stops at the `edges:` header.
pub fn read_node_records(text: &str) -> Result<Vec<NodeRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in node_lines(text) {
        let map = fields(line, line_no)?;
        let id = NodeId(required(&map, "id", line_no)?);
        let position = if map.contains_key("X") {
            Some(parse_position(&map, line_no)?)
        } else {
            None
        };
        let color = match optional::<f32>(&map, "R", line_no)? {
            Some(r) => Color::rgba(
                r,
                required(&map, "G", line_no)?,
                required(&map, "B", line_no)?,
                optional(&map, "A", line_no)?.unwrap_or(1.0),
            ),
            None => Color::default(),
        };
        records.push(NodeRecord {
            id,
            position,
            size: optional(&map, "size", line_no)?.unwrap_or(1.0),
            color,
            name: map.get("name").map(|s| s.to_string()),
        });
    }
    Ok(records)
}

impl Topology {
    /// Node records as they would be written by [`Topology::write_layout`].
    pub fn node_records(&self) -> Vec<NodeRecord> {
        self.nodes().iter().map(NodeRecord::from_node).collect()
    }

    /// Write the `nodes:` and `edges:` sections.
    pub fn write_layout<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{NODES_SECTION}")?;
        for node in self.nodes() {
            write_node(&mut writer, node)?;
        }
        writeln!(writer, "{EDGES_SECTION}")?;
        for edge in self.edges() {
            write_edge(&mut writer, edge)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_layout(BufWriter::new(file))?;
        info!(
            path = %path.display(),
            nodes = self.node_count(),
            edges = self.edge_count(),
            "layout_written"
        );
        Ok(())
    }

    /// Overwrite node positions from the node section of a layout text.
    ///
    /// Only `id`, `X`, `Y` and `Z` are read; size, color and every other
    /// component of the existing node are kept. Parsing stops at the
    /// `edges:` header. Returns the number of nodes updated.
    pub fn read_layout_str(&mut self, text: &str) -> Result<usize> {
        // Parse everything first so a bad line leaves the topology untouched.
        let mut updates = Vec::new();
        for (line_no, line) in node_lines(text) {
            let map = fields(line, line_no)?;
            let id = NodeId(required(&map, "id", line_no)?);
            if !self.contains_node(id) {
                return Err(TopologyError::InvalidArgument(format!(
                    "line {line_no}: node {id} out of range (node count {})",
                    self.node_count()
                )));
            }
            updates.push((id, parse_position(&map, line_no)?));
        }
        for &(id, position) in &updates {
            if let Some(node) = self.node_mut(id) {
                node.position = Some(position);
            }
        }
        debug!(updated = updates.len(), "layout_positions_applied");
        Ok(updates.len())
    }

    pub fn read_layout_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        self.read_layout_str(&text)
    }
}
