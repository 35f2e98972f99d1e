use mctree_rs::data::{Matrix, TrainingData};
use mctree_rs::{SearchConfig, TreeSearch};
use numpy::{PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

pub fn to_value_error<T, E: std::fmt::Display>(value: Result<T, E>) -> Result<T, PyErr> {
    match value {
        Ok(v) => Ok(v),
        Err(e) => Err(PyValueError::new_err(e.to_string())),
    }
}

/// The result of a search, holding the textual form of the winning tree.
#[pyclass]
pub struct Solution {
    #[pyo3(get)]
    tree: String,
}

#[pyfunction]
#[pyo3(signature = (features, labels, exploration, num_expansions, sparsity, k))]
fn search(
    features: PyReadonlyArray2<bool>,
    labels: PyReadonlyArray1<bool>,
    exploration: f64,
    num_expansions: usize,
    sparsity: f64,
    k: f64,
) -> PyResult<Solution> {
    let features = features.as_array();
    let (rows, cols) = (features.nrows(), features.ncols());

    // repack row-major numpy input into the column-major layout Matrix expects
    let mut data_vec: Vec<bool> = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            data_vec.push(features[[i, j]]);
        }
    }
    let labels_vec: Vec<bool> = labels.as_array().iter().copied().collect();

    let matrix = Matrix::new(&data_vec, rows, cols);
    let data = to_value_error(TrainingData::new(matrix, &labels_vec))?;
    let cfg = SearchConfig {
        exploration,
        num_expansions,
        sparsity,
        k,
    };
    let mut session = to_value_error(TreeSearch::new(&data, &cfg))?;
    let tree = to_value_error(session.search())?;
    Ok(Solution { tree: tree.to_string() })
}

#[pymodule]
fn mctree(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(search, m)?)?;
    m.add_class::<Solution>()?;

    Ok(())
}
