//! Turning dataset values into renderer-agnostic payloads.
//!
//! Values are classified once by rank into a [Rank], which is then consumed by
//! [render_table], [render_curve] and [render_image]. The payloads describe what to draw, and
//! the browser does the drawing.

use crate::container::NodeValue;

use ndarray::{ArrayD, ArrayView1, ArrayView2, Ix0, Ix1, Ix2};
use serde::Serialize;

/// Number format applied to numeric table columns.
pub const NUMBER_FORMAT: &str = "0,0.0000000000";

/// Interaction tools offered on plots.
pub static PLOT_TOOLS: [&str; 7] = [
    "pan",
    "wheel_zoom",
    "box_zoom",
    "reset",
    "save",
    "box_select",
    "hover",
];

/// A value classified by its number of dimensions
#[derive(Debug)]
pub enum Rank<'a, T> {
    /// Rank 0
    Scalar(&'a T),
    /// Rank 1
    Vector(ArrayView1<'a, T>),
    /// Rank 2
    Matrix(ArrayView2<'a, T>),
    /// Any higher rank, which is not rendered
    Unsupported(usize),
}

impl<'a, T> Rank<'a, T> {
    /// Classify an array by its rank.
    pub fn of(array: &'a ArrayD<T>) -> Self {
        let ndim = array.ndim();
        let view = array.view();
        let rank = match ndim {
            0 => view
                .into_dimensionality::<Ix0>()
                .map(|scalar| Rank::Scalar(scalar.into_scalar())),
            1 => view.into_dimensionality::<Ix1>().map(Rank::Vector),
            2 => view.into_dimensionality::<Ix2>().map(Rank::Matrix),
            _ => Ok(Rank::Unsupported(ndim)),
        };
        rank.unwrap_or(Rank::Unsupported(ndim))
    }
}

/// One table cell
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(i64),
    Unsigned(u64),
    Number(f64),
    Text(String),
}

/// Element types that can fill a table cell.
pub trait ToCell {
    fn to_cell(&self) -> Cell;
}

impl ToCell for i64 {
    fn to_cell(&self) -> Cell {
        Cell::Integer(*self)
    }
}

impl ToCell for u64 {
    fn to_cell(&self) -> Cell {
        Cell::Unsigned(*self)
    }
}

impl ToCell for f64 {
    fn to_cell(&self) -> Cell {
        Cell::Number(*self)
    }
}

impl ToCell for String {
    fn to_cell(&self) -> Cell {
        Cell::Text(self.clone())
    }
}

/// One named table column
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    /// Key of the column in the data source
    pub field: String,
    /// Column heading
    pub title: String,
    /// Width of the column in pixels
    pub width: u32,
    /// Number format, for numeric columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    /// Cell values, top to bottom
    pub values: Vec<Cell>,
}

/// A table of columns
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    /// Preferred width of the table in pixels, if fixed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Preferred height of the table in pixels
    pub height: u32,
    pub columns: Vec<Column>,
}

/// Visual style shared by all curves
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurveStyle {
    pub line_width: f64,
    pub line_alpha: f64,
    pub line_color: &'static str,
    pub marker: &'static str,
    pub marker_fill: &'static str,
    pub marker_size: f64,
}

/// The style of every curve.
pub const CURVE_STYLE: CurveStyle = CurveStyle {
    line_width: 3.0,
    line_alpha: 0.6,
    line_color: "#009eea",
    marker: "circle",
    marker_fill: "white",
    marker_size: 10.0,
};

/// One x/y series, drawn as a line with markers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Curve {
    pub title: String,
    pub legend: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: CurveStyle,
    pub tools: &'static [&'static str],
}

/// A 2-D grid of values drawn as an image
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Image {
    pub title: String,
    /// Rows of the grid
    pub image: Vec<Vec<f64>>,
    pub x: f64,
    pub y: f64,
    /// Extent along x, the size of the first dimension
    pub dw: usize,
    /// Extent along y, the size of the second dimension
    pub dh: usize,
    pub tools: &'static [&'static str],
}

/// Any payload handed to the browser
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderPayload {
    Table(Table),
    Curve(Curve),
    Image(Image),
}

/// Build a single column.
fn column<'a, T, I>(index: usize, values: I, format: Option<&'static str>, width: u32) -> Column
where
    T: ToCell + 'a,
    I: IntoIterator<Item = &'a T>,
{
    Column {
        field: index.to_string(),
        title: index.to_string(),
        width,
        format,
        values: values.into_iter().map(ToCell::to_cell).collect(),
    }
}

/// Lay out a value of any element type as a table.
fn table_of<T: ToCell>(
    title: &str,
    array: &ArrayD<T>,
    format: Option<&'static str>,
) -> Option<Table> {
    // Text scalars get a single wide column.
    let (cell_width, scalar_size) = match format {
        Some(_) => (100, (200, 200)),
        None => (400, (400, 200)),
    };
    let (width, height, columns) = match Rank::of(array) {
        Rank::Scalar(value) => (
            Some(scalar_size.0),
            scalar_size.1,
            vec![column(0, [value], format, cell_width)],
        ),
        Rank::Vector(vector) => (
            Some(200),
            800,
            vec![column(0, vector.iter(), format, cell_width)],
        ),
        Rank::Matrix(matrix) => {
            let columns = matrix
                .columns()
                .into_iter()
                .enumerate()
                .map(|(index, values)| column(index, values, format, cell_width))
                .collect();
            (None, 800, columns)
        }
        Rank::Unsupported(_) => return None,
    };
    Some(Table {
        title: title.to_string(),
        width,
        height,
        columns,
    })
}

/// Render a value as a table.
///
/// A scalar gives one row and one column, a vector one column holding every element, and a
/// matrix one column per matrix column, titled by its zero-based index. Rank 3 and above give
/// `None`.
///
/// # Arguments
///
/// * `title`: Title of the table, usually the node's name
/// * `value`: The materialised dataset value
pub fn render_table(title: &str, value: &NodeValue) -> Option<Table> {
    match value {
        NodeValue::Integer(array) => table_of(title, array, Some(NUMBER_FORMAT)),
        NodeValue::Unsigned(array) => table_of(title, array, Some(NUMBER_FORMAT)),
        NodeValue::Numeric(array) => table_of(title, array, Some(NUMBER_FORMAT)),
        NodeValue::Text(array) => table_of(title, array, None),
    }
}

fn curve(title: &str, y: Vec<f64>) -> Curve {
    Curve {
        title: title.to_string(),
        legend: title.to_string(),
        x: (0..y.len()).map(|index| index as f64).collect(),
        y,
        style: CURVE_STYLE,
        tools: &PLOT_TOOLS,
    }
}

/// Render a value as curves, with x the index of each element.
///
/// A scalar gives one single-point curve, a vector one curve, and a matrix one curve per row.
/// Text values and rank 3 and above give no curves.
pub fn render_curve(title: &str, value: &NodeValue) -> Vec<Curve> {
    let Some(array) = value.to_f64() else {
        return vec![];
    };
    match Rank::of(&*array) {
        Rank::Scalar(scalar) => vec![curve(title, vec![*scalar])],
        Rank::Vector(vector) => vec![curve(title, vector.to_vec())],
        Rank::Matrix(matrix) => matrix
            .rows()
            .into_iter()
            .map(|row| curve(title, row.to_vec()))
            .collect(),
        Rank::Unsupported(_) => vec![],
    }
}

/// Render a matrix as an image whose extent is the matrix's shape.
///
/// Anything other than a numeric matrix gives `None`.
pub fn render_image(title: &str, value: &NodeValue) -> Option<Image> {
    let array = value.to_f64()?;
    let Rank::Matrix(matrix) = Rank::of(&*array) else {
        return None;
    };
    let (dw, dh) = matrix.dim();
    Some(Image {
        title: title.to_string(),
        image: matrix.rows().into_iter().map(|row| row.to_vec()).collect(),
        x: 0.0,
        y: 0.0,
        dw,
        dh,
        tools: &PLOT_TOOLS,
    })
}
