// Static world features (altar, radio) patched into tile maps at setup.

use glam::IVec2;
use std::collections::BTreeMap;
use std::fmt;

pub const BUILDINGS_LAYER: &str = "Buildings";
pub const FRONT_LAYER: &str = "Front";
pub const MAIN_TILE_SHEET: &str = "untitled tile sheet";
pub const RADIO_TILE_INDEX: i32 = 512;
pub const RADIO_ACTION: &str = "MagicRadio";
// Altar patches cover a 3x3 tile area.
pub const ALTAR_SIZE: i32 = 3;

const DEFAULT_ALTAR: IVec2 = IVec2::new(36, 15);
const DEFAULT_RADIO: IVec2 = IVec2::new(1, 5);
const DEFAULT_RADIO_EXPANDED: IVec2 = IVec2::new(5, 23);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapPatchError {
    MissingLayer(String),
    MissingTileSheet(String),
    OutOfBounds { layer: String, position: IVec2 },
}

impl fmt::Display for MapPatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapPatchError::MissingLayer(name) => write!(f, "layer '{name}' not found"),
            MapPatchError::MissingTileSheet(name) => write!(f, "tile sheet '{name}' not found"),
            MapPatchError::OutOfBounds { layer, position } => {
                write!(f, "tile {position} outside layer '{layer}'")
            }
        }
    }
}

impl std::error::Error for MapPatchError {}

/// Where the static features go. Negative coordinates mean "use the default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePlacement {
    pub altar_location: String,
    pub altar_x: i32,
    pub altar_y: i32,
    pub radio_location: String,
    pub radio_x: i32,
    pub radio_y: i32,
    pub has_expanded_map: bool,
}

impl Default for FeaturePlacement {
    fn default() -> Self {
        Self {
            altar_location: "SeedShop".to_string(),
            altar_x: -1,
            altar_y: -1,
            radio_location: "WizardHouse".to_string(),
            radio_x: -1,
            radio_y: -1,
            has_expanded_map: false,
        }
    }
}

impl FeaturePlacement {
    pub fn altar_position(&self) -> IVec2 {
        IVec2::new(
            or_default(self.altar_x, DEFAULT_ALTAR.x),
            or_default(self.altar_y, DEFAULT_ALTAR.y),
        )
    }

    pub fn radio_position(&self) -> IVec2 {
        let fallback = if self.has_expanded_map {
            DEFAULT_RADIO_EXPANDED
        } else {
            DEFAULT_RADIO
        };
        IVec2::new(
            or_default(self.radio_x, fallback.x),
            or_default(self.radio_y, fallback.y),
        )
    }
}

fn or_default(value: i32, fallback: i32) -> i32 {
    if value < 0 { fallback } else { value }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTile {
    pub sheet: String,
    pub index: i32,
    pub properties: BTreeMap<String, String>,
}

impl StaticTile {
    pub fn new(sheet: impl Into<String>, index: i32) -> Self {
        Self {
            sheet: sheet.into(),
            index,
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub id: String,
    width: i32,
    height: i32,
    tiles: Vec<Option<StaticTile>>,
}

impl TileLayer {
    pub fn new(id: impl Into<String>, width: i32, height: i32) -> Self {
        let cells = (width.max(0) * height.max(0)) as usize;
        Self {
            id: id.into(),
            width: width.max(0),
            height: height.max(0),
            tiles: vec![None; cells],
        }
    }

    fn index(&self, position: IVec2) -> Option<usize> {
        if position.x < 0 || position.y < 0 || position.x >= self.width || position.y >= self.height {
            return None;
        }
        Some((position.y * self.width + position.x) as usize)
    }

    pub fn tile(&self, position: IVec2) -> Option<&StaticTile> {
        self.index(position).and_then(|i| self.tiles[i].as_ref())
    }

    pub fn tile_mut(&mut self, position: IVec2) -> Option<&mut StaticTile> {
        self.index(position).and_then(|i| self.tiles[i].as_mut())
    }

    pub fn set_tile(&mut self, position: IVec2, tile: StaticTile) -> Result<(), MapPatchError> {
        let Some(i) = self.index(position) else {
            return Err(MapPatchError::OutOfBounds {
                layer: self.id.clone(),
                position,
            });
        };
        self.tiles[i] = Some(tile);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMap {
    pub layers: Vec<TileLayer>,
    pub tile_sheets: Vec<String>,
}

impl TileMap {
    pub fn layer(&self, id: &str) -> Option<&TileLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut TileLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn has_tile_sheet(&self, id: &str) -> bool {
        self.tile_sheets.iter().any(|s| s == id)
    }

    fn require_layer(&self, id: &str) -> Result<(), MapPatchError> {
        match self.layer(id) {
            Some(_) => Ok(()),
            None => Err(MapPatchError::MissingLayer(id.to_string())),
        }
    }
}

/// Puts the radio tile on the front layer and tags it with the radio action.
/// The action goes on the buildings tile when there is one at `position`.
/// Nothing is written unless every prerequisite is present.
pub fn place_radio(map: &mut TileMap, position: IVec2) -> Result<(), MapPatchError> {
    map.require_layer(BUILDINGS_LAYER)?;
    map.require_layer(FRONT_LAYER)?;
    if !map.has_tile_sheet(MAIN_TILE_SHEET) {
        return Err(MapPatchError::MissingTileSheet(MAIN_TILE_SHEET.to_string()));
    }

    let front = map
        .layer_mut(FRONT_LAYER)
        .ok_or_else(|| MapPatchError::MissingLayer(FRONT_LAYER.to_string()))?;
    front.set_tile(position, StaticTile::new(MAIN_TILE_SHEET, RADIO_TILE_INDEX))?;

    let action_tile = match map
        .layer(BUILDINGS_LAYER)
        .and_then(|layer| layer.tile(position))
    {
        Some(_) => map
            .layer_mut(BUILDINGS_LAYER)
            .and_then(|layer| layer.tile_mut(position)),
        None => map
            .layer_mut(FRONT_LAYER)
            .and_then(|layer| layer.tile_mut(position)),
    };
    if let Some(tile) = action_tile {
        tile.properties
            .insert("Action".to_string(), RADIO_ACTION.to_string());
    }
    Ok(())
}

/// Copies the altar patch into `map` with its top-left tile at `position`.
/// Every layer and tile sheet the patch uses must already exist in `map`.
pub fn place_altar(map: &mut TileMap, altar: &TileMap, position: IVec2) -> Result<(), MapPatchError> {
    for layer in &altar.layers {
        map.require_layer(&layer.id)?;
    }
    for sheet in &altar.tile_sheets {
        if !map.has_tile_sheet(sheet) {
            return Err(MapPatchError::MissingTileSheet(sheet.clone()));
        }
    }
    for layer in &altar.layers {
        if let Some(target) = map.layer(&layer.id) {
            let corner = position + IVec2::splat(ALTAR_SIZE - 1);
            if target.index(position).is_none() || target.index(corner).is_none() {
                return Err(MapPatchError::OutOfBounds {
                    layer: layer.id.clone(),
                    position: corner,
                });
            }
        }
    }

    for layer in &altar.layers {
        let Some(target) = map.layer_mut(&layer.id) else {
            continue;
        };
        for y in 0..ALTAR_SIZE {
            for x in 0..ALTAR_SIZE {
                let offset = IVec2::new(x, y);
                if let Some(tile) = layer.tile(offset) {
                    target.set_tile(position + offset, tile.clone())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard_house() -> TileMap {
        TileMap {
            layers: vec![
                TileLayer::new(BUILDINGS_LAYER, 20, 20),
                TileLayer::new(FRONT_LAYER, 20, 20),
            ],
            tile_sheets: vec![MAIN_TILE_SHEET.to_string()],
        }
    }

    #[test]
    fn when_coordinates_negative_then_defaults_apply() {
        let mut placement = FeaturePlacement::default();
        assert_eq!(placement.altar_position(), IVec2::new(36, 15));
        assert_eq!(placement.radio_position(), IVec2::new(1, 5));

        placement.has_expanded_map = true;
        placement.radio_y = 9;
        assert_eq!(placement.radio_position(), IVec2::new(5, 9));
    }

    #[test]
    fn when_buildings_tile_missing_then_action_goes_on_front_tile() {
        let mut map = wizard_house();
        let position = IVec2::new(1, 5);

        place_radio(&mut map, position).expect("radio placed");

        let front = map.layer(FRONT_LAYER).and_then(|l| l.tile(position));
        let front = front.expect("front tile written");
        assert_eq!(front.index, RADIO_TILE_INDEX);
        assert_eq!(front.properties.get("Action").map(String::as_str), Some(RADIO_ACTION));
    }

    #[test]
    fn when_buildings_tile_present_then_it_carries_the_action() {
        let mut map = wizard_house();
        let position = IVec2::new(1, 5);
        if let Some(layer) = map.layer_mut(BUILDINGS_LAYER) {
            layer
                .set_tile(position, StaticTile::new(MAIN_TILE_SHEET, 3))
                .expect("in bounds");
        }

        place_radio(&mut map, position).expect("radio placed");

        let building = map.layer(BUILDINGS_LAYER).and_then(|l| l.tile(position));
        assert_eq!(
            building.and_then(|t| t.properties.get("Action")).map(String::as_str),
            Some(RADIO_ACTION)
        );
        let front = map.layer(FRONT_LAYER).and_then(|l| l.tile(position));
        assert!(front.is_some_and(|t| t.properties.is_empty()));
    }

    #[test]
    fn when_prerequisite_missing_then_map_is_untouched() {
        let mut no_front = wizard_house();
        no_front.layers.retain(|l| l.id != FRONT_LAYER);
        let before = no_front.clone();
        assert_eq!(
            place_radio(&mut no_front, IVec2::new(1, 5)),
            Err(MapPatchError::MissingLayer(FRONT_LAYER.to_string()))
        );
        assert_eq!(no_front, before);

        let mut no_sheet = wizard_house();
        no_sheet.tile_sheets.clear();
        assert_eq!(
            place_radio(&mut no_sheet, IVec2::new(1, 5)),
            Err(MapPatchError::MissingTileSheet(MAIN_TILE_SHEET.to_string()))
        );
    }

    #[test]
    fn when_radio_outside_layer_then_out_of_bounds() {
        let mut map = wizard_house();

        let result = place_radio(&mut map, IVec2::new(40, 5));

        assert!(matches!(result, Err(MapPatchError::OutOfBounds { .. })));
    }

    #[test]
    fn when_altar_patched_then_tiles_land_at_offset() {
        let mut shop = TileMap {
            layers: vec![TileLayer::new(BUILDINGS_LAYER, 50, 30)],
            tile_sheets: vec![MAIN_TILE_SHEET.to_string()],
        };
        let mut patch_layer = TileLayer::new(BUILDINGS_LAYER, 3, 3);
        patch_layer
            .set_tile(IVec2::new(1, 1), StaticTile::new(MAIN_TILE_SHEET, 77))
            .expect("in bounds");
        let altar = TileMap {
            layers: vec![patch_layer],
            tile_sheets: vec![MAIN_TILE_SHEET.to_string()],
        };

        place_altar(&mut shop, &altar, IVec2::new(36, 15)).expect("altar placed");

        let placed = shop.layer(BUILDINGS_LAYER).and_then(|l| l.tile(IVec2::new(37, 16)));
        assert_eq!(placed.map(|t| t.index), Some(77));
        assert!(place_altar(&mut shop, &altar, IVec2::new(48, 15)).is_err());
    }
}
