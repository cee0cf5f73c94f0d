//! Parser for the compact path command strings stored in shape and clip records.
//!
//! The grammar is a small subset of SVG path data: `M L C Q H V Z` and their relative
//! lowercase forms. Parsing is lenient: a command with the wrong number of arguments, or with
//! an argument that is not a number, is dropped and leaves the current point untouched.

use kurbo::{BezPath, PathEl, Point, Vec2};

/// Parses `d` into a path. Returns `None` for an empty command string.
pub fn parse_path(d: &str) -> Option<BezPath> {
    if d.is_empty() {
        return None;
    }
    Some(PathParser::new().parse(d))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathParser {
    /// Reproduce the historical `V`/`v` output, which places the new point at
    /// `(current.y, y)` instead of `(current.x, y)`.
    pub legacy_vertical: bool,
}

impl PathParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser matching the output of older players byte for byte.
    pub fn legacy() -> Self {
        Self {
            legacy_vertical: true,
        }
    }

    pub fn parse(&self, d: &str) -> BezPath {
        let mut pen = Pen::default();
        let mut path = BezPath::new();
        for (command, raw_args) in segments(d) {
            let Some(args) = parse_args(raw_args) else {
                continue;
            };
            if let Some(el) = pen.apply(command, &args, self.legacy_vertical) {
                path.push(el);
            }
        }
        path
    }
}

/// Splits the command string at every ASCII letter. Text before the first letter is ignored.
fn segments(d: &str) -> Vec<(char, &str)> {
    let mut out = Vec::new();
    let mut open: Option<(char, usize)> = None;
    for (i, ch) in d.char_indices() {
        if ch.is_ascii_alphabetic() {
            if let Some((command, start)) = open.take() {
                out.push((command, &d[start..i]));
            }
            open = Some((ch, i + ch.len_utf8()));
        }
    }
    if let Some((command, start)) = open {
        out.push((command, &d[start..]));
    }
    out
}

fn parse_args(raw: &str) -> Option<Vec<f64>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>().ok())
        .collect()
}

#[derive(Default)]
struct Pen {
    current: Point,
    subpath_start: Point,
}

impl Pen {
    fn apply(&mut self, command: char, args: &[f64], legacy_vertical: bool) -> Option<PathEl> {
        let origin = if command.is_ascii_lowercase() {
            self.current.to_vec2()
        } else {
            Vec2::ZERO
        };
        let point = |i: usize| Point::new(args[i], args[i + 1]) + origin;

        let el = match (command.to_ascii_uppercase(), args.len()) {
            ('M', 2) => {
                let p = point(0);
                self.subpath_start = p;
                PathEl::MoveTo(p)
            }
            ('L', 2) => PathEl::LineTo(point(0)),
            ('C', 6) => PathEl::CurveTo(point(0), point(2), point(4)),
            ('Q', 4) => PathEl::QuadTo(point(0), point(2)),
            ('H', 1) => PathEl::LineTo(Point::new(args[0] + origin.x, self.current.y)),
            ('V', 1) => {
                let x = if legacy_vertical {
                    self.current.y
                } else {
                    self.current.x
                };
                PathEl::LineTo(Point::new(x, args[0] + origin.y))
            }
            ('Z', _) => PathEl::ClosePath,
            _ => return None,
        };

        self.current = match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) | PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => p,
            PathEl::ClosePath => self.subpath_start,
        };
        Some(el)
    }
}
