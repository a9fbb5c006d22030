// Draw commands emitted by effects and projectiles; consumed by whatever renders them.

use glam::Vec2;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpriteSheet {
    Objects,
    Tools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SourceRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square cell `index` on a sheet laid out row-major with `columns` cells per row.
    pub const fn cell(index: i32, columns: i32, size: i32) -> Self {
        Self::new(
            (index % columns) * size,
            (index / columns) * size,
            size,
            size,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteDraw {
    pub sheet: SpriteSheet,
    pub source: SourceRect,
    // World-space position of the sprite origin.
    pub position: Vec2,
    pub origin: Vec2,
    pub rotation: f32,
    pub scale: f32,
    pub layer_depth: f32,
}

pub type DrawList = Vec<SpriteDraw>;
