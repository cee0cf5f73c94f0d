use kurbo::{Affine, Size};
use serde::{Deserialize, Serialize};

/// How the movie canvas is placed inside the presentation surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Stretch both axes independently.
    ScaleToFill,
    /// Largest uniform scale that shows the whole canvas, centered.
    #[default]
    AspectFit,
    /// Smallest uniform scale that covers the surface, centered.
    AspectFill,
    /// Match widths, pin to the top edge.
    Top,
    /// Match widths, pin to the bottom edge.
    Bottom,
    /// Match heights, pin to the left edge.
    Left,
    /// Match heights, pin to the right edge.
    Right,
}

/// Transform from canvas coordinates to surface coordinates.
///
/// Returns identity when either size is degenerate.
pub fn fit_transform(canvas: Size, surface: Size, mode: ContentMode) -> Affine {
    if canvas.width <= 0.0 || canvas.height <= 0.0 || surface.width <= 0.0 || surface.height <= 0.0 {
        return Affine::IDENTITY;
    }
    let sx = surface.width / canvas.width;
    let sy = surface.height / canvas.height;

    let uniform = |scale: f64, tx: f64, ty: f64| Affine::new([scale, 0.0, 0.0, scale, tx, ty]);
    let centered = |scale: f64| {
        uniform(
            scale,
            (surface.width - canvas.width * scale) / 2.0,
            (surface.height - canvas.height * scale) / 2.0,
        )
    };

    match mode {
        ContentMode::ScaleToFill => Affine::scale_non_uniform(sx, sy),
        ContentMode::AspectFit => centered(sx.min(sy)),
        ContentMode::AspectFill => centered(sx.max(sy)),
        ContentMode::Top => uniform(sx, 0.0, 0.0),
        ContentMode::Bottom => uniform(sx, 0.0, surface.height - canvas.height * sx),
        ContentMode::Left => uniform(sy, 0.0, 0.0),
        ContentMode::Right => uniform(sy, surface.width - canvas.width * sy, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    const CANVAS: Size = Size::new(200.0, 100.0);
    const SURFACE: Size = Size::new(100.0, 100.0);

    fn map(mode: ContentMode, p: (f64, f64)) -> Point {
        fit_transform(CANVAS, SURFACE, mode) * Point::new(p.0, p.1)
    }

    #[test]
    fn test_aspect_fit_centers_vertically() {
        assert_eq!(map(ContentMode::AspectFit, (0.0, 0.0)), Point::new(0.0, 25.0));
        assert_eq!(map(ContentMode::AspectFit, (200.0, 100.0)), Point::new(100.0, 75.0));
    }

    #[test]
    fn test_aspect_fill_centers_horizontally() {
        assert_eq!(map(ContentMode::AspectFill, (0.0, 0.0)), Point::new(-50.0, 0.0));
        assert_eq!(map(ContentMode::AspectFill, (200.0, 100.0)), Point::new(150.0, 100.0));
    }

    #[test]
    fn test_edges() {
        assert_eq!(map(ContentMode::Top, (0.0, 0.0)), Point::new(0.0, 0.0));
        assert_eq!(map(ContentMode::Bottom, (0.0, 100.0)), Point::new(0.0, 100.0));
        assert_eq!(map(ContentMode::Left, (0.0, 0.0)), Point::new(0.0, 0.0));
        assert_eq!(map(ContentMode::Right, (200.0, 0.0)), Point::new(100.0, 0.0));
        assert_eq!(map(ContentMode::ScaleToFill, (200.0, 100.0)), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_degenerate_sizes() {
        assert_eq!(
            fit_transform(Size::ZERO, SURFACE, ContentMode::AspectFit),
            Affine::IDENTITY
        );
    }
}
