use std::collections::HashMap;

use svga_data::model::{self as data, shape_entity};
use svga_data::Message;

fn sample_movie() -> data::MovieEntity {
    let keep = data::ShapeEntity {
        r#type: shape_entity::ShapeType::Keep as i32,
        ..Default::default()
    };
    let path = data::ShapeEntity {
        r#type: shape_entity::ShapeType::Shape as i32,
        args: Some(shape_entity::Args::Shape(shape_entity::ShapeArgs {
            d: "M0 0 L10 0 L10 10 Z".to_string(),
        })),
        ..Default::default()
    };

    let mut images = HashMap::new();
    images.insert("avatar".to_string(), b"avatar_file".to_vec());

    data::MovieEntity {
        version: "1.1.0".to_string(),
        params: Some(data::MovieParams {
            view_box_width: 750.0,
            view_box_height: 750.0,
            fps: 15,
            frames: 2,
        }),
        images,
        sprites: vec![data::SpriteEntity {
            image_key: "shape.vector".to_string(),
            matte_key: String::new(),
            frames: vec![
                data::FrameEntity {
                    alpha: 1.0,
                    layout: Some(data::Layout {
                        x: 0.0,
                        y: 0.0,
                        width: 10.0,
                        height: 10.0,
                    }),
                    transform: Some(data::Transform::IDENTITY),
                    clip_path: String::new(),
                    shapes: vec![path],
                },
                data::FrameEntity {
                    alpha: 1.0,
                    shapes: vec![keep],
                    ..Default::default()
                },
            ],
        }],
        audios: vec![data::AudioEntity {
            audio_key: "bgm".to_string(),
            start_frame: 0,
            end_frame: 2,
            start_time: 0,
            total_time: 1200,
        }],
    }
}

#[test]
fn test_parse_full_movie() {
    let bytes = sample_movie().encode_to_vec();
    let movie = data::MovieEntity::decode(bytes.as_slice()).expect("Failed to decode movie");

    assert_eq!(movie.images.get("avatar").map(Vec::as_slice), Some(&b"avatar_file"[..]));
    assert_eq!(movie.sprites.len(), 1);
    let frames = &movie.sprites[0].frames;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].shapes[0].r#type(), shape_entity::ShapeType::Keep);
    assert!(frames[1].layout.is_none());
    assert_eq!(movie.audios[0].total_time, 1200);
}

#[test]
fn test_parse_garbage_fails() {
    let res = data::MovieEntity::decode(&[0xff, 0xff, 0xff, 0xff][..]);
    assert!(res.is_err());
}
