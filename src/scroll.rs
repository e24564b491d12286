//! Simulated page scroll
//!
//! Stands in for a document taller than the window. Wheel and keyboard
//! input move `scroll_top`; [`PageScroll::progress`] turns that into the
//! [0, 1] scalar the sky consumes.

/// Pixels moved per wheel notch or arrow key
pub const LINE_STEP: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageScroll {
    pub scroll_top: f32,
    pub document_height: f32,
    pub viewport_height: f32,
}

impl PageScroll {
    /// A page `pages` viewports tall, scrolled to the top
    pub fn new(viewport_height: f32, pages: f32) -> Self {
        Self {
            scroll_top: 0.0,
            document_height: viewport_height * pages.max(1.0),
            viewport_height,
        }
    }

    /// Largest valid `scroll_top`; 0 when the document fits the viewport
    pub fn max_scroll(&self) -> f32 {
        (self.document_height - self.viewport_height).max(0.0)
    }

    /// `scroll_top / (document_height - viewport_height)`, clamped to [0, 1].
    /// A non-positive scrollable range or NaN yields 0.
    pub fn progress(&self) -> f32 {
        let range = self.document_height - self.viewport_height;
        if range.is_nan() || range <= 0.0 {
            return 0.0;
        }
        let p = self.scroll_top / range;
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }

    pub fn scroll_to(&mut self, top: f32) {
        self.scroll_top = if top.is_nan() {
            0.0
        } else {
            top.clamp(0.0, self.max_scroll())
        };
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.scroll_to(self.scroll_top + delta);
    }

    /// Jump to a progress value, e.g. one received from a remote source
    pub fn scroll_to_progress(&mut self, progress: f32) {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        self.scroll_to(p * self.max_scroll());
    }

    pub fn page_down(&mut self) {
        self.scroll_by(self.viewport_height);
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-self.viewport_height);
    }

    pub fn home(&mut self) {
        self.scroll_to(0.0);
    }

    pub fn end(&mut self) {
        self.scroll_to(self.max_scroll());
    }

    /// Keep the document the same number of viewports tall and the
    /// progress unchanged across a window resize
    pub fn set_viewport_height(&mut self, height: f32) {
        let progress = self.progress();
        let pages = if self.viewport_height > 0.0 {
            self.document_height / self.viewport_height
        } else {
            1.0
        };
        self.viewport_height = height;
        self.document_height = height * pages.max(1.0);
        self.scroll_to_progress(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_progress_formula() {
        let mut page = PageScroll::new(500.0, 5.0);
        assert_eq!(page.progress(), 0.0);
        page.scroll_to(1000.0);
        assert_relative_eq!(page.progress(), 0.5);
        page.end();
        assert_eq!(page.progress(), 1.0);
    }

    #[test]
    fn test_progress_degenerate_ranges() {
        let page = PageScroll {
            scroll_top: 100.0,
            document_height: 400.0,
            viewport_height: 400.0,
        };
        assert_eq!(page.progress(), 0.0);

        let short = PageScroll {
            scroll_top: 100.0,
            document_height: 300.0,
            viewport_height: 400.0,
        };
        assert_eq!(short.progress(), 0.0);

        let nan = PageScroll {
            scroll_top: f32::NAN,
            document_height: 1000.0,
            viewport_height: 400.0,
        };
        assert_eq!(nan.progress(), 0.0);
    }

    #[test]
    fn test_progress_clamped_when_overscrolled() {
        let page = PageScroll {
            scroll_top: 5000.0,
            document_height: 1000.0,
            viewport_height: 400.0,
        };
        assert_eq!(page.progress(), 1.0);
        let under = PageScroll {
            scroll_top: -50.0,
            ..page
        };
        assert_eq!(under.progress(), 0.0);
    }

    #[test]
    fn test_scroll_by_stays_in_document() {
        let mut page = PageScroll::new(400.0, 3.0);
        page.scroll_by(-LINE_STEP);
        assert_eq!(page.scroll_top, 0.0);
        for _ in 0..100 {
            page.page_down();
        }
        assert_eq!(page.scroll_top, page.max_scroll());
        page.page_up();
        assert_relative_eq!(page.scroll_top, 400.0);
        page.home();
        assert_eq!(page.scroll_top, 0.0);
    }

    #[test]
    fn test_resize_keeps_progress() {
        let mut page = PageScroll::new(400.0, 4.0);
        page.scroll_to_progress(0.25);
        page.set_viewport_height(900.0);
        assert_relative_eq!(page.document_height, 3600.0);
        assert_relative_eq!(page.progress(), 0.25, epsilon = 1e-5);
    }
}
