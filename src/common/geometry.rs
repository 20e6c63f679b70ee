use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }
}

/// Uniform grid assigning every projection index a resting cell. The cell
/// size is the pitch between neighboring resting positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub container: Rect,
    pub columns: usize,
    pub cell: Size,
}

impl GridGeometry {
    pub fn new(container: Rect, columns: usize, cell: Size) -> Self {
        debug_assert!(columns > 0, "grid must have at least one column");
        Self { container, columns, cell }
    }

    pub fn resting_rect(&self, index: usize) -> Rect {
        let columns = self.columns.max(1);
        let col = index % columns;
        let row = index / columns;
        Rect::new(
            Point::new(
                self.container.origin.x + col as f64 * self.cell.width,
                self.container.origin.y + row as f64 * self.cell.height,
            ),
            self.cell,
        )
    }

    pub fn resting_center(&self, index: usize) -> Point {
        self.resting_rect(index).center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_cells_tile_the_grid() {
        let grid = GridGeometry::new(
            Rect::new(Point::new(0.0, 0.0), Size::new(300.0, 400.0)),
            2,
            Size::new(150.0, 200.0),
        );
        assert_eq!(grid.resting_center(0), Point::new(75.0, 100.0));
        assert_eq!(grid.resting_center(1), Point::new(225.0, 100.0));
        assert_eq!(grid.resting_center(2), Point::new(75.0, 300.0));
        assert_eq!(grid.resting_rect(3).bottom(), 400.0);
    }
}
