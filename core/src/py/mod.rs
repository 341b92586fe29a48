use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::error::ImportError;
use crate::preview::Preview;
use crate::records_from_bytes;

fn py_err(e: ImportError) -> PyErr {
    PyValueError::new_err(format!("{}: {}", e.user_message(), e))
}

/// FIT-bytes → postbatch som JSON.
#[pyfunction]
fn map_fit_bytes(data: &[u8]) -> PyResult<String> {
    let records = records_from_bytes(data).map_err(py_err)?;
    serde_json::to_string(&records.records())
        .map_err(|e| PyValueError::new_err(format!("serialize error: {e}")))
}

/// FIT-bytes → forhåndsvisning som JSON.
#[pyfunction]
fn preview_fit_bytes(data: &[u8]) -> PyResult<String> {
    let records = records_from_bytes(data).map_err(py_err)?;
    serde_json::to_string(&Preview::from_records(&records))
        .map_err(|e| PyValueError::new_err(format!("serialize error: {e}")))
}

#[pymodule]
fn fitbridge_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(map_fit_bytes, m)?)?;
    m.add_function(wrap_pyfunction!(preview_fit_bytes, m)?)?;
    Ok(())
}
