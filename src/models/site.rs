//! Site, tile and processor catalog entities, consumed at the boundary
//! only. Ownership and lifecycle live with the external ingestion process.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Satellite {
    Sentinel2,
    Landsat8,
}

impl Satellite {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Sentinel2 => 1,
            Self::Landsat8 => 2,
        }
    }

    pub fn from_i16(value: i16) -> Result<Self, String> {
        match value {
            1 => Ok(Self::Sentinel2),
            2 => Ok(Self::Landsat8),
            _ => Err(format!("Invalid satellite id: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub satellite: Satellite,
    pub tile_id: String,
}

/// A registered processing stage; job submissions must reference one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processor {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub description: Option<String>,
}
