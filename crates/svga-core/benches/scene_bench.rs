use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use svga_core::{parse_path, DynamicOverrides, MovieEntity, SceneResolver};
use svga_data::model::{self as data, shape_entity};

fn vector_movie(sprites: usize, frames: usize) -> MovieEntity {
    let shape = |i: usize| data::ShapeEntity {
        r#type: shape_entity::ShapeType::Shape as i32,
        args: Some(shape_entity::Args::Shape(shape_entity::ShapeArgs {
            d: format!("M{i} 0 C10 10 20 20 30 {i} Q5 5 10 10 L100 100 Z"),
        })),
        ..Default::default()
    };
    let keep = data::ShapeEntity {
        r#type: shape_entity::ShapeType::Keep as i32,
        ..Default::default()
    };

    let sprites = (0..sprites)
        .map(|s| data::SpriteEntity {
            image_key: format!("sprite_{s}.vector"),
            matte_key: String::new(),
            frames: (0..frames)
                .map(|f| data::FrameEntity {
                    alpha: 1.0,
                    transform: Some(data::Transform::IDENTITY),
                    // Every other frame reuses the previous shapes.
                    shapes: if f % 2 == 0 {
                        vec![shape(f), shape(f + 1)]
                    } else {
                        vec![keep.clone()]
                    },
                    ..Default::default()
                })
                .collect(),
        })
        .collect();

    let record = data::MovieEntity {
        version: "2.0.0".to_string(),
        params: Some(data::MovieParams {
            view_box_width: 750.0,
            view_box_height: 750.0,
            fps: 30,
            frames: frames as i32,
        }),
        images: HashMap::new(),
        sprites,
        audios: Vec::new(),
    };
    MovieEntity::from_record(record, None).expect("valid movie")
}

fn bench_scene_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("SceneResolver::step");

    for &sprites in &[10usize, 100, 500] {
        let movie = vector_movie(sprites, 60);
        let overrides = DynamicOverrides::default();
        let mut resolver = SceneResolver::new();
        resolver.prepare(&movie).expect("no mattes");

        group.bench_with_input(BenchmarkId::new("sprites", sprites), &sprites, |b, _| {
            let mut index = 0;
            b.iter(|| {
                resolver.step(&movie, index, &overrides);
                index = (index + 1) % movie.frames;
            })
        });
    }

    group.finish();
}

fn bench_parse_path(c: &mut Criterion) {
    let d = "M0 0 C10 10 20 20 30 30 ".repeat(200);
    c.bench_function("parse_path", |b| b.iter(|| parse_path(&d)));
}

criterion_group!(benches, bench_scene_step, bench_parse_path);
criterion_main!(benches);
