use std::cell::Cell;

use crate::coordinate::Pixel;

/// Narrow view of a scrollbar widget driven by a viewport.
///
/// Values are pixels relative to the viewport's minimum origin. All methods
/// take `&self`; implementations use interior mutability or forward to a
/// toolkit handle.
pub trait Scrollbar {
    fn selection(&self) -> Pixel;
    fn set_selection(&self, selection: Pixel);
    fn maximum(&self) -> Pixel;
    fn set_maximum(&self, maximum: Pixel);
    fn set_thumb(&self, thumb: Pixel);
    fn set_increments(&self, step: Pixel, page: Pixel);
    fn set_visible(&self, visible: bool);
}

/// Scrollbar that only records what the viewport pushed into it.
#[derive(Debug, Default)]
pub struct HeadlessScrollbar {
    selection: Cell<Pixel>,
    maximum: Cell<Pixel>,
    thumb: Cell<Pixel>,
    step: Cell<Pixel>,
    page: Cell<Pixel>,
    visible: Cell<bool>,
}

impl HeadlessScrollbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thumb(&self) -> Pixel {
        self.thumb.get()
    }

    pub fn increments(&self) -> (Pixel, Pixel) {
        (self.step.get(), self.page.get())
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

impl Scrollbar for HeadlessScrollbar {
    fn selection(&self) -> Pixel {
        self.selection.get()
    }

    fn set_selection(&self, selection: Pixel) {
        self.selection.set(selection);
    }

    fn maximum(&self) -> Pixel {
        self.maximum.get()
    }

    fn set_maximum(&self, maximum: Pixel) {
        self.maximum.set(maximum);
    }

    fn set_thumb(&self, thumb: Pixel) {
        self.thumb.set(thumb);
    }

    fn set_increments(&self, step: Pixel, page: Pixel) {
        self.step.set(step);
        self.page.set(page);
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}
