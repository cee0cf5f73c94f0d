//! Per-frame scene resolution.
//!
//! A [`SceneResolver`] is prepared once per movie: it validates the matte relationships and
//! allocates one layer per sprite. Stepping it to a frame index refreshes every layer's
//! [`DrawDescriptor`] in place; [`SceneResolver::snapshot`] copies them out in sprite order.

use crate::entity::{Bitmap, FrameEntity, MovieEntity, ShapeStyle, SpriteEntity, SpriteKind};
use crate::errors::SceneError;
use crate::pool::LayerPool;
use kurbo::{Affine, BezPath, Rect};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Host supplied replacements, keyed by sprite image key. They win over the archive.
#[derive(Clone, Debug, Default)]
pub struct DynamicOverrides {
    images: HashMap<String, Arc<Bitmap>>,
    hidden: HashMap<String, bool>,
}

impl DynamicOverrides {
    /// Replaces the bitmap of every sprite using `key`. `None` restores the archive bitmap.
    pub fn set_image(&mut self, key: impl Into<String>, image: Option<Arc<Bitmap>>) {
        let key = key.into();
        match image {
            Some(image) => {
                self.images.insert(key, image);
            }
            None => {
                self.images.remove(&key);
            }
        }
    }

    pub fn set_hidden(&mut self, key: impl Into<String>, hidden: bool) {
        self.hidden.insert(key.into(), hidden);
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.hidden.clear();
    }

    pub fn image(&self, key: &str) -> Option<&Arc<Bitmap>> {
        self.images.get(key)
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.get(key).copied().unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedShape {
    /// Outline in the shape's own space.
    pub path: BezPath,
    pub transform: Affine,
    pub style: Option<ShapeStyle>,
}

/// Everything a renderer needs to draw one sprite for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawDescriptor {
    pub sprite_index: usize,
    pub image_key: String,
    pub kind: SpriteKind,
    /// `false` when the sprite has no frame at this index, is fully transparent, or is hidden
    /// by an override. Hidden descriptors are still emitted to keep sprite identity stable.
    pub visible: bool,
    pub bitmap: Option<Arc<Bitmap>>,
    pub alpha: f64,
    pub layout: Rect,
    pub transform: Affine,
    pub nx: f64,
    pub ny: f64,
    pub clip: Option<BezPath>,
    pub shapes: Vec<ResolvedShape>,
    /// Sprite index of the matte layer masking this sprite.
    pub mask: Option<usize>,
}

impl Default for DrawDescriptor {
    fn default() -> Self {
        Self {
            sprite_index: 0,
            image_key: String::new(),
            kind: SpriteKind::Bitmap,
            visible: false,
            bitmap: None,
            alpha: 0.0,
            layout: Rect::ZERO,
            transform: Affine::IDENTITY,
            nx: 0.0,
            ny: 0.0,
            clip: None,
            shapes: Vec::new(),
            mask: None,
        }
    }
}

impl DrawDescriptor {
    fn apply_frame(&mut self, frame: &FrameEntity) {
        self.alpha = frame.alpha;
        self.layout = frame.layout;
        self.transform = frame.transform;
        self.nx = frame.nx;
        self.ny = frame.ny;
        self.clip = frame.clip().cloned();
        self.shapes.clear();
        self.shapes.extend(frame.shapes.iter().filter_map(|shape| {
            shape.geometry().map(|path| ResolvedShape {
                path: path.clone(),
                transform: shape.transform,
                style: shape.style.clone(),
            })
        }));
    }

    fn clear_frame(&mut self) {
        self.alpha = 0.0;
        self.layout = Rect::ZERO;
        self.transform = Affine::IDENTITY;
        self.nx = 0.0;
        self.ny = 0.0;
        self.clip = None;
        self.shapes.clear();
    }
}

/// Resolved draw list of one frame, in sprite order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub index: usize,
    pub descriptors: Vec<DrawDescriptor>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, sprite_index: usize) -> Option<&DrawDescriptor> {
        self.descriptors.get(sprite_index)
    }

    /// Visible content layers; matte layers are reached through `mask` instead.
    pub fn drawable(&self) -> impl Iterator<Item = &DrawDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.visible && d.kind != SpriteKind::Matte)
    }

    /// The matte layer masking `descriptor`, if any.
    pub fn mask_of(&self, descriptor: &DrawDescriptor) -> Option<&DrawDescriptor> {
        descriptor.mask.and_then(|index| self.descriptors.get(index))
    }
}

/// Reusable per-sprite state.
#[derive(Debug, Default)]
pub struct SpriteLayer {
    descriptor: DrawDescriptor,
}

impl SpriteLayer {
    fn bind(&mut self, sprite_index: usize, sprite: &SpriteEntity, mask: Option<usize>) {
        let d = &mut self.descriptor;
        d.sprite_index = sprite_index;
        d.image_key.clear();
        d.image_key.push_str(&sprite.image_key);
        d.kind = sprite.kind();
        d.mask = mask;
        d.visible = false;
        d.bitmap = None;
        d.clear_frame();
    }

    fn step(&mut self, sprite: &SpriteEntity, index: usize, movie: &MovieEntity, overrides: &DynamicOverrides) {
        let d = &mut self.descriptor;
        d.bitmap = overrides
            .image(&sprite.image_key)
            .or_else(|| movie.image(&sprite.image_key))
            .cloned();
        match sprite.frame(index) {
            Some(frame) => {
                d.apply_frame(frame);
                d.visible = frame.alpha > 0.0 && !overrides.is_hidden(&sprite.image_key);
            }
            None => {
                d.clear_frame();
                d.visible = false;
            }
        }
    }

    pub fn descriptor(&self) -> &DrawDescriptor {
        &self.descriptor
    }
}

/// Checks matte ordering and returns, per sprite, the index of the matte masking it.
fn matte_plan(movie: &MovieEntity) -> Result<Vec<Option<usize>>, SceneError> {
    let mut mattes: HashMap<&str, usize> = HashMap::new();
    let mut plan = Vec::with_capacity(movie.sprites.len());

    for (index, sprite) in movie.sprites.iter().enumerate() {
        if sprite.is_matte() {
            mattes.insert(sprite.image_key.as_str(), index);
            plan.push(None);
            continue;
        }
        let Some(matte_key) = sprite.matte_key() else {
            plan.push(None);
            continue;
        };
        if let Some(&matte) = mattes.get(matte_key) {
            plan.push(Some(matte));
            continue;
        }

        let later = movie
            .sprites
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, other)| other.is_matte() && other.image_key == matte_key);
        if let Some((matte_sprite, _)) = later {
            return Err(SceneError::StructuralInconsistency {
                sprite: index,
                image_key: sprite.image_key.clone(),
                matte_key: matte_key.to_string(),
                matte_sprite,
            });
        }
        warn!(sprite = index, matte_key, "matte layer not found, drawing unmasked");
        plan.push(None);
    }
    Ok(plan)
}

#[derive(Debug, Default)]
pub struct SceneResolver {
    pool: LayerPool<SpriteLayer>,
    layers: Vec<SpriteLayer>,
}

impl SceneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that every matte layer precedes the sprites it masks.
    pub fn validate(movie: &MovieEntity) -> Result<(), SceneError> {
        matte_plan(movie).map(|_| ())
    }

    /// Builds the layer table for `movie`. On error the current layers are kept.
    pub fn prepare(&mut self, movie: &MovieEntity) -> Result<(), SceneError> {
        let plan = matte_plan(movie)?;
        self.reset();
        for (index, (sprite, mask)) in movie.sprites.iter().zip(plan).enumerate() {
            let mut layer = self.pool.allocate();
            layer.bind(index, sprite, mask);
            self.layers.push(layer);
        }
        Ok(())
    }

    /// Returns every layer to the pool.
    pub fn reset(&mut self) {
        self.pool.recycle_all(self.layers.drain(..));
    }

    /// Refreshes all layers for frame `index` of the movie passed to `prepare`.
    pub fn step(&mut self, movie: &MovieEntity, index: usize, overrides: &DynamicOverrides) {
        for layer in &mut self.layers {
            if let Some(sprite) = movie.sprite(layer.descriptor.sprite_index) {
                layer.step(sprite, index, movie, overrides);
            }
        }
    }

    pub fn layers(&self) -> &[SpriteLayer] {
        &self.layers
    }

    pub fn snapshot(&self, index: usize) -> Scene {
        Scene {
            index,
            descriptors: self.layers.iter().map(|l| l.descriptor.clone()).collect(),
        }
    }

    pub fn pool(&self) -> &LayerPool<SpriteLayer> {
        &self.pool
    }
}

/// Resolves frame `index` of `movie` without any playback state.
pub fn resolve_scene(
    movie: &MovieEntity,
    index: usize,
    overrides: &DynamicOverrides,
) -> Result<Scene, SceneError> {
    let mut resolver = SceneResolver::new();
    resolver.prepare(movie)?;
    resolver.step(movie, index, overrides);
    Ok(resolver.snapshot(index))
}
