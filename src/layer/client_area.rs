use std::cell::Cell;

use crate::coordinate::Rectangle;

/// Supplies the pixel area a layer may draw into.
pub trait ClientAreaProvider {
    fn client_area(&self) -> Rectangle;
}

/// Client area set explicitly by the application (e.g. on window resize).
#[derive(Debug, Default)]
pub struct FixedClientArea(Cell<Rectangle>);

impl FixedClientArea {
    pub fn new(area: Rectangle) -> Self {
        Self(Cell::new(area))
    }

    pub fn set(&self, area: Rectangle) {
        self.0.set(area);
    }
}

impl ClientAreaProvider for FixedClientArea {
    fn client_area(&self) -> Rectangle {
        self.0.get()
    }
}
