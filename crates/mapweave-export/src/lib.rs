//! mapweave-export: Pure trajectory parsers and graph serializers (sans-IO)
//!
//! Reads trajectory text in the two supported input layouts and writes
//! road graphs as adjacency lists, vertex/edge tables, and SVG. Every
//! function takes and returns strings; file handling is the caller's.

pub mod graph_text;
pub mod svg;
pub mod trajectory;

pub use graph_text::{to_adjacency_list, to_edge_table, to_vertex_table};
pub use svg::{SvgMetadata, to_svg};
pub use trajectory::{ParseError, TrajectoryFormat, parse_trajectory};
