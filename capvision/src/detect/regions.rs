use opencv::{
    core::{Mat, Rect},
    prelude::*,
};

use super::circles::Circle;

/// Axis-aligned bounding box of a circle. `x`/`y` may be negative for circles
/// near the image border until clamped by the crop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn from_circle(c: &Circle) -> Self {
        Self {
            x: c.x - c.r,
            y: c.y - c.r,
            width: 2 * c.r,
            height: 2 * c.r,
        }
    }
}

pub fn rectangles_from_circles(circles: &[Circle]) -> Vec<Rectangle> {
    circles.iter().map(Rectangle::from_circle).collect()
}

/// Crop each rectangle out of the image into an owned sub-image.
///
/// Negative origins are clamped to 0 without re-expanding the extent, so a
/// crop near the border may be smaller than the requested square. Rectangles
/// whose effective region is empty are dropped. The rectangle paired with
/// each crop keeps the clamped origin and the requested extent.
pub fn crop_regions(img: &Mat, rectangles: &[Rectangle]) -> anyhow::Result<Vec<(Mat, Rectangle)>> {
    let mut crops = Vec::new();
    for rect in rectangles {
        let x = rect.x.max(0);
        let y = rect.y.max(0);
        let width = rect.width.min(img.cols() - x);
        let height = rect.height.min(img.rows() - y);
        if width <= 0 || height <= 0 {
            continue;
        }

        let crop = Mat::roi(img, Rect::new(x, y, width, height))?.try_clone()?;
        crops.push((
            crop,
            Rectangle {
                x,
                y,
                width: rect.width,
                height: rect.height,
            },
        ));
    }

    Ok(crops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1};

    fn image(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(128.0)).unwrap()
    }

    #[test]
    fn rectangle_is_the_bounding_box_of_the_circle() {
        let c = Circle { x: 120, y: 80, r: 30 };
        let rect = Rectangle::from_circle(&c);
        assert_eq!(rect, Rectangle { x: 90, y: 50, width: 60, height: 60 });
        assert_eq!(rect.width, rect.height);
        assert_eq!(rect.width, 2 * c.r);
    }

    #[test]
    fn in_bounds_rectangles_crop_to_their_exact_extent() {
        let img = image(200, 300);
        let rects = vec![Rectangle { x: 10, y: 20, width: 50, height: 50 }];
        let crops = crop_regions(&img, &rects).unwrap();
        assert_eq!(crops.len(), 1);
        let (crop, rect) = &crops[0];
        assert_eq!((crop.rows(), crop.cols()), (50, 50));
        assert_eq!(*rect, rects[0]);
    }

    #[test]
    fn negative_origins_clamp_without_growing_the_crop() {
        let img = image(200, 300);
        let circle = Circle { x: 0, y: 0, r: 30 };
        let rects = rectangles_from_circles(&[circle]);
        assert_eq!(rects[0], Rectangle { x: -30, y: -30, width: 60, height: 60 });

        let crops = crop_regions(&img, &rects).unwrap();
        assert_eq!(crops.len(), 1);
        let (crop, rect) = &crops[0];
        assert_eq!((rect.x, rect.y), (0, 0));
        assert!(crop.rows() <= 60 && crop.cols() <= 60);
        assert_eq!((crop.rows(), crop.cols()), (60, 60));
    }

    #[test]
    fn crops_clipped_at_the_far_border_shrink() {
        let img = image(100, 100);
        let rects = vec![Rectangle { x: 80, y: 80, width: 60, height: 60 }];
        let crops = crop_regions(&img, &rects).unwrap();
        assert_eq!(crops.len(), 1);
        let (crop, rect) = &crops[0];
        assert_eq!((crop.rows(), crop.cols()), (20, 20));
        assert_eq!((rect.width, rect.height), (60, 60));
    }

    #[test]
    fn empty_effective_regions_are_dropped() {
        let img = image(100, 100);
        let rects = vec![
            Rectangle { x: 0, y: 0, width: 0, height: 0 },
            Rectangle { x: 500, y: 500, width: 60, height: 60 },
        ];
        assert!(crop_regions(&img, &rects).unwrap().is_empty());
    }
}
