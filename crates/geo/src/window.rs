//! Axis aligned pixel rectangles inside a raster grid.

use crate::RasterSize;

/// A rectangular region of raster cells, `col_off`/`row_off` is the top left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl Window {
    pub const fn new(col_off: usize, row_off: usize, cols: usize, rows: usize) -> Self {
        Window {
            col_off,
            row_off,
            cols,
            rows,
        }
    }

    /// The window covering the complete raster
    pub const fn for_raster(size: RasterSize) -> Self {
        Window::new(0, 0, size.cols, size.rows)
    }

    pub const fn size(&self) -> RasterSize {
        RasterSize::with_rows_cols(self.rows, self.cols)
    }

    /// One past the last column
    pub const fn end_col(&self) -> usize {
        self.col_off + self.cols
    }

    /// One past the last row
    pub const fn end_row(&self) -> usize {
        self.row_off + self.rows
    }

    pub const fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// True if the window lies completely inside a raster of the given size
    pub const fn is_within(&self, size: RasterSize) -> bool {
        self.end_col() <= size.cols && self.end_row() <= size.rows
    }

    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_off && row < self.end_row() && col >= self.col_off && col < self.end_col()
    }

    pub fn intersects(&self, other: &Window) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.col_off < other.end_col()
            && other.col_off < self.end_col()
            && self.row_off < other.end_row()
            && other.row_off < self.end_row()
    }

    pub fn intersection(&self, other: &Window) -> Option<Window> {
        if !self.intersects(other) {
            return None;
        }

        let col_off = self.col_off.max(other.col_off);
        let row_off = self.row_off.max(other.row_off);
        let end_col = self.end_col().min(other.end_col());
        let end_row = self.end_row().min(other.end_row());

        Some(Window::new(col_off, row_off, end_col - col_off, end_row - row_off))
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(col: {}, row: {}, {}x{})", self.col_off, self.row_off, self.cols, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_intersection() {
        let w1 = Window::new(0, 0, 10, 10);
        let w2 = Window::new(4, 4, 1, 1);

        assert_eq!(w1.intersection(&w2), Some(w2));
        assert_eq!(w2.intersection(&w1), Some(w2));
    }

    #[test]
    fn window_self_intersection() {
        let w1 = Window::new(3, 7, 10, 4);
        assert_eq!(w1.intersection(&w1), Some(w1));
    }

    #[test]
    fn window_partial_intersection() {
        let w1 = Window::new(0, 0, 10, 10);
        let w2 = Window::new(8, 5, 10, 10);
        assert_eq!(w1.intersection(&w2), Some(Window::new(8, 5, 2, 5)));
    }

    #[test]
    fn adjacent_windows_do_not_intersect() {
        let w1 = Window::new(0, 0, 10, 10);
        let w2 = Window::new(10, 0, 10, 10);

        assert!(!w1.intersects(&w2));
        assert!(w1.intersection(&w2).is_none());
    }

    #[test]
    fn empty_window_intersection() {
        let w1 = Window::new(0, 0, 10, 10);
        let w2 = Window::new(5, 5, 0, 3);
        assert!(w1.intersection(&w2).is_none());
    }

    #[test]
    fn bounds() {
        let size = RasterSize::with_rows_cols(10, 20);
        assert!(Window::new(15, 5, 5, 5).is_within(size));
        assert!(!Window::new(15, 5, 6, 5).is_within(size));
        assert!(Window::for_raster(size).is_within(size));

        let w = Window::new(2, 3, 4, 5);
        assert!(w.contains(3, 2));
        assert!(w.contains(7, 5));
        assert!(!w.contains(8, 5));
        assert!(!w.contains(3, 6));
        assert_eq!(w.to_string(), "(col: 2, row: 3, 4x5)");
    }
}
