// Installs the static altar and radio into the locations a peer loads.

use crate::domain::features::{FeaturePlacement, TileMap, place_altar, place_radio};
use crate::domain::state::World;
use tracing::{info, warn};

/// Patches each feature into its configured location's map. A missing map or
/// failed patch is logged and that feature skipped. Returns how many were placed.
pub fn install_static_features(
    placement: &FeaturePlacement,
    world: &mut World,
    altar_patch: &TileMap,
) -> usize {
    let mut placed = 0;

    let altar = placement.altar_position();
    match map_of(world, &placement.altar_location) {
        Some(map) => match place_altar(map, altar_patch, altar) {
            Ok(()) => {
                info!(location = %placement.altar_location, x = altar.x, y = altar.y, "altar placed");
                placed += 1;
            }
            Err(err) => warn!(
                location = %placement.altar_location,
                error = %err,
                "can't add altar"
            ),
        },
        None => warn!(location = %placement.altar_location, "can't add altar: map not loaded"),
    }

    let radio = placement.radio_position();
    match map_of(world, &placement.radio_location) {
        Some(map) => match place_radio(map, radio) {
            Ok(()) => {
                info!(location = %placement.radio_location, x = radio.x, y = radio.y, "radio placed");
                placed += 1;
            }
            Err(err) => warn!(
                location = %placement.radio_location,
                error = %err,
                "can't add radio"
            ),
        },
        None => warn!(location = %placement.radio_location, "can't add radio: map not loaded"),
    }

    placed
}

fn map_of<'a>(world: &'a mut World, location: &str) -> Option<&'a mut TileMap> {
    world.location_mut(location).and_then(|l| l.map.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{
        BUILDINGS_LAYER, FRONT_LAYER, MAIN_TILE_SHEET, RADIO_TILE_INDEX, StaticTile, TileLayer,
    };
    use crate::domain::state::Location;
    use glam::{IVec2, Vec2};

    fn map(layers: &[&str], width: i32, height: i32) -> TileMap {
        TileMap {
            layers: layers
                .iter()
                .map(|id| TileLayer::new(*id, width, height))
                .collect(),
            tile_sheets: vec![MAIN_TILE_SHEET.to_string()],
        }
    }

    fn altar_patch() -> TileMap {
        let mut layer = TileLayer::new(BUILDINGS_LAYER, 3, 3);
        layer
            .set_tile(IVec2::ZERO, StaticTile::new(MAIN_TILE_SHEET, 1))
            .expect("in bounds");
        TileMap {
            layers: vec![layer],
            tile_sheets: vec![MAIN_TILE_SHEET.to_string()],
        }
    }

    fn world(radio_layers: &[&str]) -> World {
        let mut world = World::new();
        world.insert_location(
            Location::new("SeedShop", Vec2::splat(3200.0)).with_map(map(&[BUILDINGS_LAYER], 50, 30)),
        );
        world.insert_location(
            Location::new("WizardHouse", Vec2::splat(1280.0)).with_map(map(radio_layers, 20, 20)),
        );
        world
    }

    #[test]
    fn when_both_maps_loaded_then_both_features_placed() {
        let mut world = world(&[BUILDINGS_LAYER, FRONT_LAYER]);

        let placed = install_static_features(&FeaturePlacement::default(), &mut world, &altar_patch());

        assert_eq!(placed, 2);
        let radio = world
            .location("WizardHouse")
            .and_then(|l| l.map.as_ref())
            .and_then(|m| m.layer(FRONT_LAYER))
            .and_then(|l| l.tile(IVec2::new(1, 5)))
            .map(|t| t.index);
        assert_eq!(radio, Some(RADIO_TILE_INDEX));
    }

    #[test]
    fn when_radio_map_lacks_front_layer_then_only_altar_placed() {
        let mut world = world(&[BUILDINGS_LAYER]);

        let placed = install_static_features(&FeaturePlacement::default(), &mut world, &altar_patch());

        assert_eq!(placed, 1);
    }

    #[test]
    fn when_location_has_no_map_then_nothing_placed() {
        let mut world = World::new();
        world.insert_location(Location::new("SeedShop", Vec2::splat(3200.0)));

        assert_eq!(
            install_static_features(&FeaturePlacement::default(), &mut world, &altar_patch()),
            0
        );
    }
}
