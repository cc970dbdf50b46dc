use std::cell::RefCell;
use std::rc::Rc;

use super::{ChildSpec, CompositeLayer};
use crate::command::LayerCommand;
use crate::config::GridConfig;
use crate::coordinate::{Axis, Pixel, Range, Rectangle};
use crate::data::{
    ColumnHeaderDataProvider, ColumnLabelAccumulator, CornerDataProvider, DataLayer, DataProvider,
    RowHeaderDataProvider,
};
use crate::dimension::DimensionallyDependentLayer;
use crate::layer::{execute, flush_events, ClientAreaProvider, FixedClientArea, Layer, SharedLayer};
use crate::persistence::Properties;
use crate::reorder::ReorderLayer;
use crate::selection::SelectionLayer;
use crate::viewport::ViewportLayer;

pub const CORNER: &str = "CORNER";
pub const COLUMN_HEADER: &str = "COLUMN_HEADER";
pub const ROW_HEADER: &str = "ROW_HEADER";
pub const BODY: &str = "BODY";

impl CompositeLayer {
    /// 2x2 grid: corner, column header / row header, body.
    ///
    /// Commands are offered to the body first, then the column header, the
    /// row header and the corner.
    pub fn grid(
        corner: SharedLayer,
        column_header: SharedLayer,
        row_header: SharedLayer,
        body: SharedLayer,
    ) -> Rc<RefCell<Self>> {
        let grid = Self::new(
            2,
            2,
            vec![
                ChildSpec::new(0, 0, CORNER, corner),
                ChildSpec::new(1, 0, COLUMN_HEADER, column_header),
                ChildSpec::new(0, 1, ROW_HEADER, row_header),
                ChildSpec::new(1, 1, BODY, body),
            ],
            &[(1, 1), (1, 0), (0, 1), (0, 0)],
        );
        grid.borrow_mut().set_primary_region(BODY);
        grid
    }
}

/// Fully wired grid over one data provider.
///
/// Body: data -> column reorder -> row reorder -> selection -> viewport.
/// Headers borrow their body dimension from the viewport.
pub struct DefaultGrid {
    body_data: Rc<RefCell<DataLayer>>,
    column_reorder: Rc<RefCell<ReorderLayer>>,
    row_reorder: Rc<RefCell<ReorderLayer>>,
    selection: Rc<RefCell<SelectionLayer>>,
    viewport: Rc<RefCell<ViewportLayer>>,
    column_header: Rc<RefCell<DimensionallyDependentLayer>>,
    row_header: Rc<RefCell<DimensionallyDependentLayer>>,
    corner: Rc<RefCell<DimensionallyDependentLayer>>,
    grid: Rc<RefCell<CompositeLayer>>,
    client_area: Rc<FixedClientArea>,
}

impl DefaultGrid {
    /// Grid with spreadsheet-letter column headers and 1-based row numbers.
    pub fn new(provider: Rc<dyn DataProvider>, config: &GridConfig) -> Self {
        let column_labels: Rc<dyn DataProvider> =
            Rc::new(ColumnHeaderDataProvider::letters(Rc::clone(&provider)));
        Self::with_column_header(provider, column_labels, config)
    }

    /// Grid with fixed column header labels.
    pub fn with_column_labels(
        provider: Rc<dyn DataProvider>,
        labels: Vec<String>,
        config: &GridConfig,
    ) -> Self {
        let column_labels: Rc<dyn DataProvider> =
            Rc::new(ColumnHeaderDataProvider::with_labels(labels));
        Self::with_column_header(provider, column_labels, config)
    }

    fn with_column_header(
        provider: Rc<dyn DataProvider>,
        column_labels: Rc<dyn DataProvider>,
        config: &GridConfig,
    ) -> Self {
        let row_labels: Rc<dyn DataProvider> =
            Rc::new(RowHeaderDataProvider::new(Rc::clone(&provider)));

        let body_data = Rc::new(RefCell::new(
            DataLayer::new(provider, config.default_column_width, config.default_row_height)
                .with_label_accumulator(Box::new(ColumnLabelAccumulator)),
        ));
        let column_reorder = ReorderLayer::columns(shared(&body_data));
        let row_reorder = ReorderLayer::rows(shared(&column_reorder));
        let selection = SelectionLayer::new(shared(&row_reorder));
        let viewport =
            ViewportLayer::with_scroll_intersection(shared(&selection), config.scroll_intersection);

        let column_header_data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(
            column_labels,
            config.default_column_width,
            config.column_header_height,
        )));
        let column_header = DimensionallyDependentLayer::new(
            SharedLayer::clone(&column_header_data),
            shared(&viewport),
            column_header_data,
        );

        let row_header_data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(
            row_labels,
            config.row_header_width,
            config.default_row_height,
        )));
        let row_header = DimensionallyDependentLayer::new(
            SharedLayer::clone(&row_header_data),
            row_header_data,
            shared(&viewport),
        );

        let corner_data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(
            Rc::new(CornerDataProvider::new(1, 1)),
            config.row_header_width,
            config.column_header_height,
        )));
        let corner =
            DimensionallyDependentLayer::new(
                corner_data,
                shared(&row_header),
                shared(&column_header),
            );

        let grid = CompositeLayer::grid(
            shared(&corner),
            shared(&column_header),
            shared(&row_header),
            shared(&viewport),
        );
        let client_area = Rc::new(FixedClientArea::default());
        grid.borrow_mut()
            .set_client_area_provider(Rc::clone(&client_area) as Rc<dyn ClientAreaProvider>);

        Self {
            body_data,
            column_reorder,
            row_reorder,
            selection,
            viewport,
            column_header,
            row_header,
            corner,
            grid,
            client_area,
        }
    }

    /// The composite at the top of the stack.
    pub fn layer(&self) -> SharedLayer {
        shared(&self.grid)
    }

    pub fn grid(&self) -> &Rc<RefCell<CompositeLayer>> {
        &self.grid
    }

    pub fn body_data(&self) -> &Rc<RefCell<DataLayer>> {
        &self.body_data
    }

    pub fn column_reorder(&self) -> &Rc<RefCell<ReorderLayer>> {
        &self.column_reorder
    }

    pub fn row_reorder(&self) -> &Rc<RefCell<ReorderLayer>> {
        &self.row_reorder
    }

    pub fn selection(&self) -> &Rc<RefCell<SelectionLayer>> {
        &self.selection
    }

    pub fn viewport(&self) -> &Rc<RefCell<ViewportLayer>> {
        &self.viewport
    }

    pub fn column_header(&self) -> &Rc<RefCell<DimensionallyDependentLayer>> {
        &self.column_header
    }

    pub fn row_header(&self) -> &Rc<RefCell<DimensionallyDependentLayer>> {
        &self.row_header
    }

    pub fn corner(&self) -> &Rc<RefCell<DimensionallyDependentLayer>> {
        &self.corner
    }

    /// Run a command against the grid and deliver the resulting events.
    pub fn execute(&self, command: &LayerCommand) -> bool {
        execute(&self.layer(), command)
    }

    /// Deliver events queued outside of [`DefaultGrid::execute`].
    pub fn flush(&self) {
        flush_events(&self.layer());
    }

    /// Set the size of the whole grid area.
    pub fn resize(&self, width: Pixel, height: Pixel) {
        self.client_area.set(Rectangle::new(0, 0, width, height));
        self.execute(&LayerCommand::ClientAreaResize);
    }

    /// Announce rows or columns inserted into the body provider.
    pub fn inserted(&self, axis: Axis, range: Range) {
        self.body_data.borrow_mut().notify_inserted(axis, range);
        self.flush();
    }

    /// Announce rows or columns removed from the body provider.
    pub fn deleted(&self, axis: Axis, ranges: &[Range]) {
        self.body_data.borrow_mut().notify_deleted(axis, ranges);
        self.flush();
    }

    pub fn save_state(&self, prefix: &str) -> Properties {
        let mut properties = Properties::new();
        self.grid.borrow().save_state(prefix, &mut properties);
        properties
    }

    pub fn load_state(&self, prefix: &str, properties: &Properties) {
        self.grid.borrow_mut().load_state(prefix, properties);
        self.flush();
    }
}

fn shared<L: Layer + 'static>(layer: &Rc<RefCell<L>>) -> SharedLayer {
    Rc::clone(layer) as SharedLayer
}
