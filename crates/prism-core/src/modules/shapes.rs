//! Shape detection module.
//!
//! The image is binarized at a fixed threshold, outlines are traced on the
//! mask and each outline is reduced to a polygon whose vertex count decides
//! the shape: 3 is a triangle, 4 a rectangle, more a circle or oval.
//! Outlines enclosing less than [`MIN_AREA`] square pixels are ignored.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ModuleError;
use crate::imaging;
use crate::module::{AnalysisModule, ModuleInput};
use crate::modules::edges::edge_map;
use crate::modules::preview::PreviewEncoder;
use crate::modules::{load_failure, round_to};
use crate::types::{AnalysisOutcome, ModuleOutput};

pub const MODULE_NAME: &str = "Shape Detector";

pub const BINARY_THRESHOLD: u8 = 127;
pub const MIN_AREA: f64 = 100.0;

/// Polygon tolerance as a fraction of the outline's perimeter.
const EPSILON_RATIO: f64 = 0.02;
const EDGE_LOW: f32 = 50.0;
const EDGE_HIGH: f32 = 150.0;
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Triangle,
    Rectangle,
    Circle,
    Other,
}

impl ShapeKind {
    pub fn from_vertices(vertices: usize) -> Self {
        match vertices {
            3 => ShapeKind::Triangle,
            4 => ShapeKind::Rectangle,
            n if n > 4 => ShapeKind::Circle,
            _ => ShapeKind::Other,
        }
    }

    fn color(self) -> Rgb<u8> {
        match self {
            ShapeKind::Triangle => Rgb([0, 0, 255]),
            ShapeKind::Rectangle => Rgb([0, 255, 0]),
            ShapeKind::Circle => Rgb([255, 0, 0]),
            ShapeKind::Other => Rgb([0, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Center {
    pub x: i64,
    pub y: i64,
}

/// One classified outline.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedShape {
    pub kind: ShapeKind,
    pub vertices: usize,
    pub area: f64,
    pub perimeter: f64,
    /// Polygon centroid, `(0, 0)` for a degenerate outline
    pub center: Center,
    #[serde(skip)]
    polygon: Vec<Point<i32>>,
}

#[derive(Debug, Clone)]
pub struct ShapeDetection {
    preview: PreviewEncoder,
}

impl ShapeDetection {
    pub fn new(preview: PreviewEncoder) -> Self {
        Self { preview }
    }

    pub fn analyze(&self, image: &DynamicImage) -> AnalysisOutcome {
        let gray = imaging::to_gray(image);
        let binary = threshold(&gray, BINARY_THRESHOLD, ThresholdType::Binary);
        let edges = edge_map(&binary, EDGE_LOW, EDGE_HIGH);
        let outlines: Vec<Vec<Point<i32>>> = find_contours::<i32>(&binary)
            .into_iter()
            .map(|c| c.points)
            .filter(|points| points.len() >= 3)
            .collect();

        let mut shapes: Vec<DetectedShape> = outlines.iter().filter_map(|o| classify(o)).collect();
        shapes.sort_by(|a, b| b.area.total_cmp(&a.area));

        let count = |kind: ShapeKind| shapes.iter().filter(|s| s.kind == kind).count();
        let triangles = count(ShapeKind::Triangle);
        let rectangles = count(ShapeKind::Rectangle);
        let circles = count(ShapeKind::Circle);
        let detail = format!(
            "Detection complete. {} shape(s) detected: {triangles} triangle(s), \
             {rectangles} square(s)/rectangle(s), {circles} circle(s)/oval(s).",
            shapes.len()
        );

        let mut outcome = AnalysisOutcome::new()
            .with_detail(detail)
            .with_metric("total_shapes", shapes.len())
            .with_metric("triangles", triangles)
            .with_metric("rectangles", rectangles)
            .with_metric("circles", circles)
            .with_metric("edge_pixels", imaging::count_white(&edges))
            .with_metric(
                "shapes",
                serde_json::to_value(&shapes).unwrap_or_default(),
            )
            .with_metric("method", "Contour detection (threshold + contours + Canny)");

        if self.preview.is_enabled() {
            let original = image.to_rgb8();
            let contours = DynamicImage::ImageRgb8(draw_outlines(&original, &outlines));
            let classified = DynamicImage::ImageRgb8(draw_shapes(&original, &shapes));
            let original = DynamicImage::ImageRgb8(original);
            let edges = DynamicImage::ImageLuma8(edges);
            outcome = self.preview.attach(
                outcome,
                &[
                    ("original", &original),
                    ("edges", &edges),
                    ("contours", &contours),
                    ("shapes", &classified),
                ],
            );
        }
        outcome
    }
}

/// Classify one traced outline, or `None` if it is too small.
fn classify(outline: &[Point<i32>]) -> Option<DetectedShape> {
    let (signed_area, centroid) = area_and_centroid(outline);
    let area = signed_area.abs();
    if area < MIN_AREA {
        return None;
    }
    let perimeter = arc_length(outline, true);
    let polygon = approximate_outline(outline, EPSILON_RATIO * perimeter);
    let (cx, cy) = centroid.unwrap_or((0.0, 0.0));
    Some(DetectedShape {
        kind: ShapeKind::from_vertices(polygon.len()),
        vertices: polygon.len(),
        area: round_to(area, 2),
        perimeter: round_to(perimeter, 2),
        center: Center {
            x: cx as i64,
            y: cy as i64,
        },
        polygon,
    })
}

/// Signed shoelace area and centroid of a closed polygon.
fn area_and_centroid(points: &[Point<i32>]) -> (f64, Option<(f64, f64)>) {
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        twice_area += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    let area = twice_area / 2.0;
    if area == 0.0 {
        return (0.0, None);
    }
    (area, Some((cx / (6.0 * area), cy / (6.0 * area))))
}

/// Closed polygon approximating `outline` within `epsilon` pixels.
///
/// The outline is split at the point farthest from its start so both halves
/// have distinct endpoints, each half is simplified separately and vertices
/// left nearly collinear with their neighbors are then dropped.
pub fn approximate_outline(outline: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let Some(&first) = outline.first() else {
        return Vec::new();
    };
    let Some(far) = (1..outline.len()).max_by_key(|&i| squared_distance(first, outline[i])) else {
        return vec![first];
    };
    if squared_distance(first, outline[far]) == 0 {
        return vec![first];
    }
    let epsilon = epsilon.max(f64::EPSILON);

    let mut polygon = approximate_polygon_dp(&outline[..=far], epsilon, false);
    let mut back = outline[far..].to_vec();
    back.push(first);
    polygon.pop();
    polygon.extend(approximate_polygon_dp(&back, epsilon, false));
    polygon.pop();

    while polygon.len() > 3 {
        let n = polygon.len();
        let flat = (0..n).find(|&i| {
            distance_to_line(polygon[i], polygon[(i + n - 1) % n], polygon[(i + 1) % n]) <= epsilon
        });
        match flat {
            Some(i) => {
                polygon.remove(i);
            }
            None => break,
        }
    }
    polygon
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = i64::from(a.x - b.x);
    let dy = i64::from(a.y - b.y);
    dx * dx + dy * dy
}

fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let length = (squared_distance(a, b) as f64).sqrt();
    if length == 0.0 {
        return (squared_distance(p, a) as f64).sqrt();
    }
    let cross = (b.x - a.x) as f64 * (p.y - a.y) as f64 - (b.y - a.y) as f64 * (p.x - a.x) as f64;
    cross.abs() / length
}

fn draw_polygon_outline(canvas: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        draw_line_segment_mut(
            canvas,
            (p.x as f32, p.y as f32),
            (q.x as f32, q.y as f32),
            color,
        );
    }
}

fn draw_outlines(original: &RgbImage, outlines: &[Vec<Point<i32>>]) -> RgbImage {
    let mut canvas = original.clone();
    for outline in outlines {
        draw_polygon_outline(&mut canvas, outline, OUTLINE_COLOR);
    }
    canvas
}

fn draw_shapes(original: &RgbImage, shapes: &[DetectedShape]) -> RgbImage {
    let mut canvas = original.clone();
    for shape in shapes {
        let color = shape.kind.color();
        draw_polygon_outline(&mut canvas, &shape.polygon, color);
        if shape.center != (Center { x: 0, y: 0 }) {
            let center = (shape.center.x as i32, shape.center.y as i32);
            draw_filled_circle_mut(&mut canvas, center, 3, color);
        }
    }
    canvas
}

impl AnalysisModule for ShapeDetection {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn priority(&self) -> i32 {
        30
    }

    fn process(&self, input: &ModuleInput) -> Result<ModuleOutput, ModuleError> {
        let image = match input.load_image() {
            Ok(image) => image,
            Err(e) => return Ok(load_failure(self.name(), e)),
        };
        Ok(self.analyze(&image).into())
    }
}

pub fn factory(config: &Config) -> Result<Arc<dyn AnalysisModule>, ModuleError> {
    Ok(Arc::new(ShapeDetection::new(PreviewEncoder::new(
        &config.modules,
    ))))
}
