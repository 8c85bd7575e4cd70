//! Catalog of neighborhood offset sets.
//!
//! Every set is a constant table of `[dx, dy, dz]` offsets, none of them the
//! origin. The ordering is fixed so sequential and parallel kernels visit
//! neighbors identically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AutomatonError, Result};

pub type Offset = [i32; 3];

#[rustfmt::skip]
pub const VON_NEUMANN: [Offset; 6] = [
    [1, 0, 0], [-1, 0, 0],
    [0, 1, 0], [0, -1, 0],
    [0, 0, 1], [0, 0, -1],
];

#[rustfmt::skip]
pub const VON_NEUMANN_2D: [Offset; 4] = [
    [1, 0, 0], [-1, 0, 0],
    [0, 1, 0], [0, -1, 0],
];

#[rustfmt::skip]
pub const MOORE: [Offset; 26] = [
    // Middle layer
    [1, 0, 0], [-1, 0, 0],
    [0, 1, 0], [0, -1, 0],
    [1, 1, 0], [-1, 1, 0],
    [1, -1, 0], [-1, -1, 0],
    // Front layer
    [1, 0, 1], [-1, 0, 1],
    [0, 1, 1], [0, -1, 1],
    [1, 1, 1], [-1, 1, 1],
    [1, -1, 1], [-1, -1, 1],
    [0, 0, 1],
    // Back layer
    [1, 0, -1], [-1, 0, -1],
    [0, 1, -1], [0, -1, -1],
    [1, 1, -1], [-1, 1, -1],
    [1, -1, -1], [-1, -1, -1],
    [0, 0, -1],
];

#[rustfmt::skip]
pub const MOORE_2D: [Offset; 8] = [
    [1, 0, 0], [-1, 0, 0],
    [0, 1, 0], [0, -1, 0],
    [1, 1, 0], [-1, 1, 0],
    [1, -1, 0], [-1, -1, 0],
];

#[rustfmt::skip]
pub const EDGES: [Offset; 12] = [
    // Above
    [1, 1, 0], [-1, 1, 0],
    [0, 1, 1], [0, 1, -1],
    // Below
    [1, -1, 0], [-1, -1, 0],
    [0, -1, 1], [0, -1, -1],
    // Same level
    [1, 0, 1], [-1, 0, 1],
    [1, 0, -1], [-1, 0, -1],
];

#[rustfmt::skip]
pub const CORNERS: [Offset; 8] = [
    [1, 1, 1], [-1, 1, 1],
    [1, 1, -1], [-1, 1, -1],
    [1, -1, 1], [-1, -1, 1],
    [1, -1, -1], [-1, -1, -1],
];

/// Named neighborhood selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodKind {
    #[default]
    VonNeumann,
    #[serde(rename = "von_neumann_2d")]
    VonNeumann2d,
    Moore,
    #[serde(rename = "moore_2d")]
    Moore2d,
    Edges,
    Corners,
}

impl NeighborhoodKind {
    pub const ALL: [NeighborhoodKind; 6] = [
        NeighborhoodKind::VonNeumann,
        NeighborhoodKind::VonNeumann2d,
        NeighborhoodKind::Moore,
        NeighborhoodKind::Moore2d,
        NeighborhoodKind::Edges,
        NeighborhoodKind::Corners,
    ];

    pub fn offsets(self) -> &'static [Offset] {
        offsets_for(self)
    }

    /// Snake case identifier, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            NeighborhoodKind::VonNeumann => "von_neumann",
            NeighborhoodKind::VonNeumann2d => "von_neumann_2d",
            NeighborhoodKind::Moore => "moore",
            NeighborhoodKind::Moore2d => "moore_2d",
            NeighborhoodKind::Edges => "edges",
            NeighborhoodKind::Corners => "corners",
        }
    }

    /// Human readable label, as shown in a settings panel.
    pub fn label(self) -> &'static str {
        match self {
            NeighborhoodKind::VonNeumann => "von neumann",
            NeighborhoodKind::VonNeumann2d => "von neumann 2D",
            NeighborhoodKind::Moore => "moore",
            NeighborhoodKind::Moore2d => "moore 2D",
            NeighborhoodKind::Edges => "edges",
            NeighborhoodKind::Corners => "corners",
        }
    }
}

/// Offsets examined for the given neighborhood.
pub fn offsets_for(kind: NeighborhoodKind) -> &'static [Offset] {
    match kind {
        NeighborhoodKind::VonNeumann => &VON_NEUMANN,
        NeighborhoodKind::VonNeumann2d => &VON_NEUMANN_2D,
        NeighborhoodKind::Moore => &MOORE,
        NeighborhoodKind::Moore2d => &MOORE_2D,
        NeighborhoodKind::Edges => &EDGES,
        NeighborhoodKind::Corners => &CORNERS,
    }
}

impl fmt::Display for NeighborhoodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts both the snake case name and the human label, case-insensitively.
impl FromStr for NeighborhoodKind {
    type Err = AutomatonError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        NeighborhoodKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted || kind.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| AutomatonError::InvalidConfig(format!("unknown neighborhood {:?}", s)))
    }
}
