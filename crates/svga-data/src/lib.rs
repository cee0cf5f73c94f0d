// svga-data: protobuf records of the SVGA container format
pub mod model;

pub use prost::Message;

#[cfg(test)]
mod tests {
    use super::model::*;
    use prost::Message;

    #[test]
    fn test_decode_minimal() {
        let movie = MovieEntity {
            version: "2.0.0".to_string(),
            params: Some(MovieParams {
                view_box_width: 300.0,
                view_box_height: 200.0,
                fps: 20,
                frames: 40,
            }),
            ..Default::default()
        };
        let bytes = movie.encode_to_vec();
        let decoded = MovieEntity::decode(bytes.as_slice()).unwrap();
        let params = decoded.params.unwrap();
        assert_eq!(decoded.version, "2.0.0");
        assert_eq!(params.fps, 20);
        assert_eq!(params.frames, 40);
        assert!(decoded.sprites.is_empty());
    }

    #[test]
    fn test_decode_shape_args() {
        let shape = ShapeEntity {
            r#type: shape_entity::ShapeType::Rect as i32,
            args: Some(shape_entity::Args::Rect(shape_entity::RectArgs {
                x: 1.0,
                y: 2.0,
                width: 30.0,
                height: 40.0,
                corner_radius: 4.0,
            })),
            styles: Some(shape_entity::ShapeStyle {
                fill: Some(shape_entity::RgbaColor {
                    r: 1.0,
                    g: 0.0,
                    b: 0.0,
                    a: 1.0,
                }),
                line_cap: shape_entity::LineCap::Round as i32,
                ..Default::default()
            }),
            transform: None,
        };
        let frame = FrameEntity {
            alpha: 0.5,
            shapes: vec![shape],
            ..Default::default()
        };

        let decoded = FrameEntity::decode(frame.encode_to_vec().as_slice()).unwrap();
        let shape = &decoded.shapes[0];
        assert_eq!(shape.r#type(), shape_entity::ShapeType::Rect);
        match &shape.args {
            Some(shape_entity::Args::Rect(rect)) => assert_eq!(rect.corner_radius, 4.0),
            other => panic!("Expected rect args, got {:?}", other),
        }
        assert_eq!(
            shape.styles.unwrap().line_cap(),
            shape_entity::LineCap::Round
        );
    }

    #[test]
    fn test_unknown_shape_type_reads_as_default() {
        let shape = ShapeEntity {
            r#type: 42,
            ..Default::default()
        };
        let decoded = ShapeEntity::decode(shape.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.r#type, 42);
        assert_eq!(decoded.r#type(), shape_entity::ShapeType::Shape);
    }
}
