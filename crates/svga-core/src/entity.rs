//! In-memory model of a decoded archive.
//!
//! Everything here is built once by [`MovieEntity::from_record`] and never mutated afterwards, so a
//! movie can be shared between players behind an `Arc`. Geometry derived from command strings is
//! parsed lazily and cached.

use crate::archive;
use crate::errors::DecodeError;
use crate::path::parse_path;
use glam::Vec4;
use image::GenericImageView;
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape as _, Size};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use svga_data::model::{self as data, shape_entity};
use tracing::debug;

/// RGBA, each channel in `0.0..=1.0`.
pub type Color = Vec4;

/// Tolerance used when flattening rounded rects and ellipses into paths.
const GEOMETRY_TOLERANCE: f64 = 0.1;

/// A decoded bitmap. Keeps the encoded bytes for the renderer along with the decoded size.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl Bitmap {
    /// Validates `data` by decoding it and records the pixel dimensions.
    pub fn decode(data: impl Into<Arc<[u8]>>) -> Result<Self, image::ImageError> {
        let data = data.into();
        let (width, height) = image::load_from_memory(&data)?.dimensions();
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

pub struct MovieEntity {
    pub version: String,
    /// Canvas (view box) size.
    pub size: Size,
    pub fps: u32,
    /// Total number of frames.
    pub frames: usize,
    pub images: HashMap<String, Arc<Bitmap>>,
    /// Sum of the raw image record sizes, including records that failed to decode.
    pub images_total_size: usize,
    pub sprites: Vec<SpriteEntity>,
    pub audios: Vec<AudioEntity>,
}

impl std::fmt::Debug for MovieEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieEntity")
            .field("version", &self.version)
            .field("size", &self.size)
            .field("fps", &self.fps)
            .field("frames", &self.frames)
            .field("images", &self.images.len())
            .field("sprites", &self.sprites.len())
            .field("audios", &self.audios.len())
            .finish()
    }
}

impl MovieEntity {
    /// Builds the entity graph from a decoded record.
    ///
    /// `images_dir` is the directory holding sibling image files, if the archive has one.
    /// Images that fail to decode are left out of the image table.
    pub fn from_record(
        record: data::MovieEntity,
        images_dir: Option<&Path>,
    ) -> Result<Self, DecodeError> {
        let params = record
            .params
            .ok_or_else(|| DecodeError::SchemaDecode("movie params are missing".to_string()))?;
        let fps = u32::try_from(params.fps)
            .ok()
            .filter(|fps| *fps > 0)
            .ok_or_else(|| DecodeError::SchemaDecode(format!("invalid fps {}", params.fps)))?;

        let (images, images_total_size) = archive::resolve_images(record.images, images_dir);
        let sprites: Vec<SpriteEntity> = record.sprites.iter().map(SpriteEntity::from_record).collect();
        let audios = record.audios.iter().map(AudioEntity::from_record).collect();

        let movie = Self {
            version: record.version,
            size: Size::new(params.view_box_width as f64, params.view_box_height as f64),
            fps,
            frames: usize::try_from(params.frames).unwrap_or(0),
            images,
            images_total_size,
            sprites,
            audios,
        };
        debug!(
            version = %movie.version,
            fps = movie.fps,
            frames = movie.frames,
            sprites = movie.sprites.len(),
            images = movie.images.len(),
            "decoded movie"
        );
        Ok(movie)
    }

    pub fn image(&self, key: &str) -> Option<&Arc<Bitmap>> {
        self.images.get(key)
    }

    pub fn sprite(&self, index: usize) -> Option<&SpriteEntity> {
        self.sprites.get(index)
    }

    pub fn audio(&self, index: usize) -> Option<&AudioEntity> {
        self.audios.get(index)
    }

    /// Length of one pass through the animation.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.fps as f64)
    }
}

/// How a sprite's image key says it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpriteKind {
    Bitmap,
    /// `*.vector`: drawn from its frame shapes.
    Vector,
    /// `*.matte`: only used as the mask of other sprites.
    Matte,
}

#[derive(Clone, Debug)]
pub struct SpriteEntity {
    pub image_key: String,
    /// Image key of the matte sprite masking this one, or empty.
    pub matte_key: String,
    pub frames: Vec<FrameEntity>,
}

impl SpriteEntity {
    pub fn from_record(record: &data::SpriteEntity) -> Self {
        let mut frames: Vec<FrameEntity> = Vec::with_capacity(record.frames.len());
        for frame_record in &record.frames {
            let mut frame = FrameEntity::from_record(frame_record);
            if frame.keep_shapes {
                frame.shapes = frames
                    .last()
                    .map(|prev| prev.shapes.clone())
                    .unwrap_or_else(|| Arc::from(Vec::new()));
            }
            frames.push(frame);
        }
        Self {
            image_key: record.image_key.clone(),
            matte_key: record.matte_key.clone(),
            frames,
        }
    }

    pub fn frame(&self, index: usize) -> Option<&FrameEntity> {
        self.frames.get(index)
    }

    pub fn kind(&self) -> SpriteKind {
        if self.image_key.ends_with(".matte") {
            SpriteKind::Matte
        } else if self.image_key.ends_with(".vector") {
            SpriteKind::Vector
        } else {
            SpriteKind::Bitmap
        }
    }

    pub fn is_matte(&self) -> bool {
        self.kind() == SpriteKind::Matte
    }

    pub fn matte_key(&self) -> Option<&str> {
        (!self.matte_key.is_empty()).then_some(self.matte_key.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct FrameEntity {
    pub alpha: f64,
    /// Bounding box before the transform is applied.
    pub layout: Rect,
    pub transform: Affine,
    pub shapes: Arc<[ShapeEntity]>,
    /// Minimum x of the transformed layout corners.
    pub nx: f64,
    /// Minimum y of the transformed layout corners.
    pub ny: f64,
    pub clip_path: String,
    /// The archive elided this frame's shapes; they are the previous frame's.
    pub keep_shapes: bool,
    clip: OnceLock<Option<BezPath>>,
}

impl FrameEntity {
    /// Decodes one frame. Keep-shapes frames come back with an empty shape list; the sprite
    /// decoder fills them in from the previous frame.
    pub fn from_record(record: &data::FrameEntity) -> Self {
        let layout = record
            .layout
            .map(|l| {
                Rect::from_origin_size(
                    (l.x as f64, l.y as f64),
                    (l.width as f64, l.height as f64),
                )
            })
            .unwrap_or(Rect::ZERO);
        let transform = record.transform.map(to_affine).unwrap_or(Affine::IDENTITY);

        let shapes: Vec<ShapeEntity> = record.shapes.iter().map(ShapeEntity::from_record).collect();
        let keep_shapes = shapes
            .first()
            .is_some_and(|shape| matches!(shape.kind, ShapeKind::Keep));

        let corners = [
            Point::new(layout.x0, layout.y0),
            Point::new(layout.x1, layout.y0),
            Point::new(layout.x0, layout.y1),
            Point::new(layout.x1, layout.y1),
        ]
        .map(|p| transform * p);
        let nx = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let ny = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

        Self {
            alpha: record.alpha as f64,
            layout,
            transform,
            shapes: if keep_shapes {
                Arc::from(Vec::new())
            } else {
                Arc::from(shapes)
            },
            nx,
            ny,
            clip_path: record.clip_path.clone(),
            keep_shapes,
            clip: OnceLock::new(),
        }
    }

    /// Clip path parsed from `clip_path`, `None` when the frame is unclipped.
    pub fn clip(&self) -> Option<&BezPath> {
        self.clip.get_or_init(|| parse_path(&self.clip_path)).as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Path { d: String },
    Rect { rect: Rect, corner_radius: f64 },
    Ellipse { center: Point, radius_x: f64, radius_y: f64 },
    /// Placeholder for "same shapes as the previous frame".
    Keep,
}

#[derive(Clone, Debug)]
pub struct ShapeEntity {
    pub kind: ShapeKind,
    pub style: Option<ShapeStyle>,
    pub transform: Affine,
    geometry: OnceLock<Option<BezPath>>,
}

impl PartialEq for ShapeEntity {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.style == other.style && self.transform == other.transform
    }
}

impl ShapeEntity {
    pub fn from_record(record: &data::ShapeEntity) -> Self {
        use shape_entity::{Args, ShapeType};

        let kind = match record.r#type() {
            ShapeType::Shape => ShapeKind::Path {
                d: match &record.args {
                    Some(Args::Shape(args)) => args.d.clone(),
                    _ => String::new(),
                },
            },
            ShapeType::Rect => {
                let args = match &record.args {
                    Some(Args::Rect(args)) => *args,
                    _ => shape_entity::RectArgs::default(),
                };
                ShapeKind::Rect {
                    rect: Rect::from_origin_size(
                        (args.x as f64, args.y as f64),
                        (args.width as f64, args.height as f64),
                    ),
                    corner_radius: args.corner_radius as f64,
                }
            }
            ShapeType::Ellipse => {
                let args = match &record.args {
                    Some(Args::Ellipse(args)) => *args,
                    _ => shape_entity::EllipseArgs::default(),
                };
                ShapeKind::Ellipse {
                    center: Point::new(args.x as f64, args.y as f64),
                    radius_x: args.radius_x as f64,
                    radius_y: args.radius_y as f64,
                }
            }
            ShapeType::Keep => ShapeKind::Keep,
        };

        Self {
            kind,
            style: record.styles.as_ref().map(ShapeStyle::from_record),
            transform: record.transform.map(to_affine).unwrap_or(Affine::IDENTITY),
            geometry: OnceLock::new(),
        }
    }

    /// Outline of the shape in its own coordinate space (before `transform`).
    pub fn geometry(&self) -> Option<&BezPath> {
        self.geometry
            .get_or_init(|| match &self.kind {
                ShapeKind::Path { d } => parse_path(d),
                ShapeKind::Rect {
                    rect,
                    corner_radius,
                } => Some(if *corner_radius > 0.0 {
                    RoundedRect::from_rect(*rect, *corner_radius).to_path(GEOMETRY_TOLERANCE)
                } else {
                    rect.to_path(GEOMETRY_TOLERANCE)
                }),
                ShapeKind::Ellipse {
                    center,
                    radius_x,
                    radius_y,
                } => Some(
                    Ellipse::new(*center, (*radius_x, *radius_y), 0.0).to_path(GEOMETRY_TOLERANCE),
                ),
                ShapeKind::Keep => None,
            })
            .as_ref()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

const LINE_CAPS: [LineCap; 5] = [
    LineCap::Butt,
    LineCap::Round,
    LineCap::Square,
    LineCap::Butt,
    LineCap::Butt,
];

const LINE_JOINS: [LineJoin; 5] = [
    LineJoin::Miter,
    LineJoin::Round,
    LineJoin::Bevel,
    LineJoin::Miter,
    LineJoin::Miter,
];

fn lookup<T: Copy + Default>(table: &[T], raw: i32) -> T {
    usize::try_from(raw)
        .ok()
        .and_then(|i| table.get(i).copied())
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashPattern {
    pub array: Vec<f64>,
    pub phase: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub miter_limit: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub dash: Option<DashPattern>,
}

impl ShapeStyle {
    pub fn from_record(record: &shape_entity::ShapeStyle) -> Self {
        let color = |c: &shape_entity::RgbaColor| Vec4::new(c.r, c.g, c.b, c.a);
        let dash = (record.line_dash_i > 0.0 || record.line_dash_ii > 0.0).then(|| DashPattern {
            array: vec![
                record.line_dash_i.max(1.0) as f64,
                record.line_dash_ii.max(0.1) as f64,
            ],
            phase: record.line_dash_iii as f64,
        });

        Self {
            fill: record.fill.as_ref().map(color),
            stroke: record.stroke.as_ref().map(color),
            stroke_width: record.stroke_width as f64,
            miter_limit: record.miter_limit as f64,
            line_cap: lookup(&LINE_CAPS, record.line_cap),
            line_join: lookup(&LINE_JOINS, record.line_join),
            dash,
        }
    }
}

/// Audio cue. Descriptive only; playback is left to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AudioEntity {
    pub audio_key: String,
    pub start_frame: i32,
    pub end_frame: i32,
    /// Milliseconds.
    pub start_time: i32,
    /// Milliseconds.
    pub total_time: i32,
}

impl AudioEntity {
    pub fn from_record(record: &data::AudioEntity) -> Self {
        Self {
            audio_key: record.audio_key.clone(),
            start_frame: record.start_frame,
            end_frame: record.end_frame,
            start_time: record.start_time,
            total_time: record.total_time,
        }
    }
}

fn to_affine(t: data::Transform) -> Affine {
    Affine::new([
        t.a as f64,
        t.b as f64,
        t.c as f64,
        t.d as f64,
        t.tx as f64,
        t.ty as f64,
    ])
}
