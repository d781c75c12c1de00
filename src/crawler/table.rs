/// Tabular result of one extraction mode.
///
/// The first row is the header and every row has the header's arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Start a table with the given header
    pub fn with_header<const N: usize>(header: [&str; N]) -> Self {
        Self {
            rows: vec![header.iter().map(|cell| cell.to_string()).collect()],
        }
    }

    /// Append a data row.
    ///
    /// Panics if the row does not have the header's arity.
    pub fn push<const N: usize>(&mut self, row: [String; N]) {
        assert_eq!(N, self.width(), "row arity must match the header");
        self.rows.push(row.into());
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    /// Data rows, without the header
    pub fn body(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    /// All rows, header first
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}
