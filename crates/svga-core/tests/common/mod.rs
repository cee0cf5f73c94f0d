//! Shared fixtures: archives are assembled in memory from protobuf records.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use prost::Message;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Arc;
use svga_core::{Bitmap, MovieEntity};
use svga_data::model::{self as data, shape_entity};
use zip::write::SimpleFileOptions;

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

pub fn bitmap(width: u32, height: u32) -> Arc<Bitmap> {
    Arc::new(Bitmap::decode(png(width, height)).expect("decode png"))
}

pub fn params(fps: i32, frames: i32) -> data::MovieParams {
    data::MovieParams {
        view_box_width: 300.0,
        view_box_height: 200.0,
        fps,
        frames,
    }
}

pub fn frame(alpha: f32) -> data::FrameEntity {
    data::FrameEntity {
        alpha,
        layout: Some(data::Layout {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
        }),
        transform: Some(data::Transform::IDENTITY),
        ..Default::default()
    }
}

pub fn path_frame(d: &str) -> data::FrameEntity {
    data::FrameEntity {
        shapes: vec![data::ShapeEntity {
            r#type: shape_entity::ShapeType::Shape as i32,
            args: Some(shape_entity::Args::Shape(shape_entity::ShapeArgs {
                d: d.to_string(),
            })),
            ..Default::default()
        }],
        ..frame(1.0)
    }
}

pub fn keep_frame() -> data::FrameEntity {
    data::FrameEntity {
        shapes: vec![data::ShapeEntity {
            r#type: shape_entity::ShapeType::Keep as i32,
            ..Default::default()
        }],
        ..frame(1.0)
    }
}

pub fn sprite(image_key: &str, matte_key: &str, frames: Vec<data::FrameEntity>) -> data::SpriteEntity {
    data::SpriteEntity {
        image_key: image_key.to_string(),
        matte_key: matte_key.to_string(),
        frames,
    }
}

/// A movie with `frames` frames and one fully opaque bitmap sprite keyed `a`.
pub fn record(frames: usize) -> data::MovieEntity {
    let mut images = HashMap::new();
    images.insert("a".to_string(), png(2, 2));
    data::MovieEntity {
        version: "2.0.0".to_string(),
        params: Some(params(20, frames as i32)),
        images,
        sprites: vec![sprite("a", "", (0..frames).map(|_| frame(1.0)).collect())],
        audios: Vec::new(),
    }
}

pub fn movie(record: data::MovieEntity) -> Arc<MovieEntity> {
    Arc::new(MovieEntity::from_record(record, None).expect("valid record"))
}

pub fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("deflate");
    encoder.finish().expect("deflate")
}

/// A 2.x archive.
pub fn modern_archive(record: &data::MovieEntity) -> Vec<u8> {
    deflate(&record.encode_to_vec())
}

/// A 1.x archive holding the given entries.
pub fn legacy_archive(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        zip.write_all(bytes).expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}
