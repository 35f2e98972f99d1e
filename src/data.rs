use crate::errors::MctreeError;
use std::fmt::Debug;

/// Contiguous Column Major Matrix data container.
///
/// Holds a dense matrix of values in a single contiguous memory block in
/// column-major order (Fortran-style), which allows for efficient column
/// slicing when scanning one feature across every sample.
///
/// # Type Parameters
/// * `T` - The type of the data (here usually `bool`).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        let i = self.item_index(0, col);
        let j = self.item_index(self.rows, col);
        &self.data[i..j]
    }
}

/// A labeled binary-feature dataset, immutable for a whole search session.
pub struct TrainingData<'a> {
    /// Binary feature matrix, one column per feature.
    pub features: Matrix<'a, bool>,
    /// Binary label for each sample.
    pub labels: &'a [bool],
    num_negative: usize,
    num_positive: usize,
}

impl<'a> TrainingData<'a> {
    /// Wrap a feature matrix and label vector, validating that the dataset
    /// can support a search: at least one sample, at least one feature, and
    /// both label classes present.
    pub fn new(features: Matrix<'a, bool>, labels: &'a [bool]) -> Result<Self, MctreeError> {
        if features.rows == 0 || labels.is_empty() {
            return Err(MctreeError::NoSamples);
        }
        if features.cols == 0 {
            return Err(MctreeError::NoFeatures);
        }
        if features.rows != labels.len() {
            return Err(MctreeError::InvalidParameter(
                "labels".to_string(),
                format!("label vector of length {}", features.rows),
                labels.len().to_string(),
            ));
        }
        let num_positive = labels.iter().filter(|&&y| y).count();
        let num_negative = labels.len() - num_positive;
        if num_positive == 0 {
            return Err(MctreeError::MissingClass("negative".to_string()));
        }
        if num_negative == 0 {
            return Err(MctreeError::MissingClass("positive".to_string()));
        }
        Ok(TrainingData {
            features,
            labels,
            num_negative,
            num_positive,
        })
    }

    /// Number of samples in the dataset.
    pub fn num_samples(&self) -> usize {
        self.features.rows
    }

    /// Number of binary features in the dataset.
    pub fn num_features(&self) -> usize {
        self.features.cols
    }

    /// Number of samples labeled negative.
    pub fn num_negative_labels(&self) -> usize {
        self.num_negative
    }

    /// Number of samples labeled positive.
    pub fn num_positive_labels(&self) -> usize {
        self.num_positive
    }
}

impl<T> Debug for Matrix<'_, T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}
