//! Map identity, node geometry and in-game positions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// In-game coordinate (relative to the game viewport origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance (no sqrt needed for nearest-node ordering).
    pub fn distance_sq(&self, other: &Position) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle. Used for node hit-regions (in-game coordinates)
/// and for match bounding boxes (screen coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, pos: &Position) -> bool {
        pos.x >= self.x && pos.x < self.x + self.w && pos.y >= self.y && pos.y < self.y + self.h
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// A labelled point on the sortie map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub hit_region: Rect,
}

impl Node {
    pub fn new(name: impl Into<String>, hit_region: Rect) -> Self {
        Self {
            name: name.into(),
            hit_region,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// World a map belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum World {
    Numbered(u8),
    Event,
}

/// Map identifier, written `"<world>-<subworld>"`, e.g. `"3-2"` or `"E-4"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MapId {
    pub world: World,
    pub subworld: u8,
}

impl MapId {
    pub fn is_event(&self) -> bool {
        self.world == World::Event
    }
}

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.world {
            World::Numbered(n) => write!(f, "{}-{}", n, self.subworld),
            World::Event => write!(f, "E-{}", self.subworld),
        }
    }
}

impl FromStr for MapId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (world, subworld) = s
            .split_once('-')
            .ok_or_else(|| format!("map id '{s}' must look like '3-2' or 'E-1'"))?;
        let world = match world {
            "E" | "e" => World::Event,
            n => World::Numbered(
                n.parse()
                    .map_err(|_| format!("map id '{s}' has an invalid world '{n}'"))?,
            ),
        };
        let subworld: u8 = subworld
            .parse()
            .map_err(|_| format!("map id '{s}' has an invalid subworld '{subworld}'"))?;
        if subworld == 0 {
            return Err(format!("map id '{s}' has subworld 0"));
        }
        Ok(Self { world, subworld })
    }
}

impl TryFrom<String> for MapId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MapId> for String {
    fn from(id: MapId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_id_parse() {
        let id: MapId = "3-2".parse().unwrap();
        assert_eq!(id.world, World::Numbered(3));
        assert_eq!(id.subworld, 2);
        assert!(!id.is_event());

        let event: MapId = "E-4".parse().unwrap();
        assert!(event.is_event());
        assert_eq!(event.to_string(), "E-4");
    }

    #[test]
    fn test_map_id_rejects_garbage() {
        assert!("32".parse::<MapId>().is_err());
        assert!("x-2".parse::<MapId>().is_err());
        assert!("1-0".parse::<MapId>().is_err());
    }

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(10, 10, 20, 20);
        assert!(r.contains(&Position::new(10, 10)));
        assert!(r.contains(&Position::new(29, 29)));
        assert!(!r.contains(&Position::new(30, 15)));
    }
}
