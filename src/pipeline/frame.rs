//! Named-column numeric table passed between pipeline stages

use crate::error::PipelineError;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// `f64` matrix with one name per column.
///
/// Values are kept in standard (row-major) layout so row-wise reductions
/// give the same bits whatever the frame height. Stages never mutate a
/// frame in place; every transform returns a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Frame {
    /// Build a frame from rows, checking that every row has one value per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, PipelineError> {
        let width = columns.len();
        for row in &rows {
            if row.len() != width {
                return Err(PipelineError::WidthMismatch {
                    expected: width,
                    got: row.len(),
                });
            }
        }

        let height = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let got = flat.len();
        let values = Array2::from_shape_vec((height, width), flat).map_err(|_| {
            PipelineError::WidthMismatch {
                expected: height * width,
                got,
            }
        })?;

        Ok(Self { columns, values })
    }

    /// Wrap an existing matrix
    pub fn from_array(columns: Vec<String>, values: Array2<f64>) -> Result<Self, PipelineError> {
        if values.ncols() != columns.len() {
            return Err(PipelineError::WidthMismatch {
                expected: columns.len(),
                got: values.ncols(),
            });
        }
        let values = if values.is_standard_layout() {
            values
        } else {
            values.as_standard_layout().into_owned()
        };
        Ok(Self { columns, values })
    }

    /// Single-row frame, as built for one prediction request
    pub fn single_row(columns: Vec<String>, row: Vec<f64>) -> Result<Self, PipelineError> {
        Self::new(columns, vec![row])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Owned copy of every row, for writers that want plain vectors
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.outer_iter().map(|row| row.to_vec()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Position of a column, or a missing-column fault
    pub fn column_index(&self, name: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Borrowed view of one column
    pub fn column_view(&self, name: &str) -> Result<ArrayView1<'_, f64>, PipelineError> {
        let idx = self.column_index(name)?;
        Ok(self.values.column(idx))
    }

    /// Copy of one column's values
    pub fn column(&self, name: &str) -> Result<Vec<f64>, PipelineError> {
        Ok(self.column_view(name)?.to_vec())
    }

    /// New frame with one extra column appended
    pub fn with_column<V: Into<Array1<f64>>>(&self, name: &str, values: V) -> Result<Self, PipelineError> {
        let column = values.into();
        if column.len() != self.n_rows() {
            return Err(PipelineError::WidthMismatch {
                expected: self.n_rows(),
                got: column.len(),
            });
        }

        let width = self.n_cols();
        let mut extended = Array2::zeros((self.n_rows(), width + 1));
        extended.slice_mut(s![.., ..width]).assign(&self.values);
        extended.column_mut(width).assign(&column);

        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        Ok(Self {
            columns,
            values: extended,
        })
    }

    /// New frame holding only the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, PipelineError> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_array(
            names.iter().map(|n| n.as_ref().to_string()).collect(),
            self.values.select(Axis(1), &indices),
        )
    }

    /// New frame holding the given rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let values = self.values.select(Axis(0), indices);
        Self {
            columns: self.columns.clone(),
            values: values.as_standard_layout().into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Frame {
        Frame::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_width_checked() {
        let err = Frame::new(vec!["a".to_string()], vec![vec![1.0, 2.0]]).unwrap_err();
        assert_eq!(err, PipelineError::WidthMismatch { expected: 1, got: 2 });

        let err = Frame::from_array(vec!["a".to_string()], Array2::zeros((2, 3))).unwrap_err();
        assert_eq!(err, PipelineError::WidthMismatch { expected: 1, got: 3 });
    }

    #[test]
    fn test_rows_land_row_major() {
        let frame = sample();
        assert_eq!(frame.values(), &array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(frame.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_with_column_leaves_input_untouched() {
        let frame = sample();
        let extended = frame.with_column("c", vec![5.0, 6.0]).unwrap();

        assert_eq!(frame.n_cols(), 2);
        assert_eq!(extended.columns(), &["a", "b", "c"]);
        assert_eq!(extended.values().row(1), array![3.0, 4.0, 6.0]);
        assert!(extended.values().is_standard_layout());

        assert_eq!(
            frame.with_column("d", vec![1.0]).unwrap_err(),
            PipelineError::WidthMismatch { expected: 2, got: 1 }
        );
    }

    #[test]
    fn test_select_reorders_and_drops() {
        let selected = sample().select(&["b"]).unwrap();
        assert_eq!(selected.columns(), &["b"]);
        assert_eq!(selected.values(), &array![[2.0], [4.0]]);

        assert_eq!(
            sample().select(&["z"]).unwrap_err(),
            PipelineError::MissingColumn("z".to_string())
        );
    }

    #[test]
    fn test_take_rows() {
        let taken = sample().take_rows(&[1]);
        assert_eq!(taken.n_rows(), 1);
        assert_eq!(taken.column("a").unwrap(), vec![3.0]);
    }

    #[test]
    fn test_empty_frame_keeps_width() {
        let frame = Frame::new(vec!["a".to_string(), "b".to_string()], Vec::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.values().dim(), (0, 2));
    }
}
