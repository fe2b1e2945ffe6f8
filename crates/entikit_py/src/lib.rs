use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use entikit_entity::{
    EntityError, EntityRepository, EnumFieldType, EnumNoticeVariant, FieldCatalog,
    FileSlotStorage, FormSession, SpecEntikitConfig, SpecFieldDefinition, SpecNotice,
    SpecSavedEntity, ValueRecord, normalize_field_id,
};
use entikit_io_xlsx::{ExportError, export_records_to_buffer, export_records_to_dir};
use entikit_log::{EnumLogFormat, LogError, SpecLogOptions, init_logging};
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "entikit.form_session.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "Notice")]
#[derive(Debug, Clone)]
struct PyNotice {
    #[pyo3(get)]
    title: String,
    #[pyo3(get)]
    description: String,
    #[pyo3(get)]
    variant: String,
}

impl From<SpecNotice> for PyNotice {
    fn from(notice: SpecNotice) -> Self {
        Self {
            title: notice.title,
            description: notice.description,
            variant: match notice.variant {
                EnumNoticeVariant::Default => "default",
                EnumNoticeVariant::Destructive => "destructive",
            }
            .to_string(),
        }
    }
}

#[pymethods]
impl PyNotice {
    fn __repr__(&self) -> String {
        format!(
            "Notice(title={:?}, description={:?}, variant={:?})",
            self.title, self.description, self.variant
        )
    }
}

#[pyclass(name = "SavedEntity")]
#[derive(Debug, Clone)]
struct PySavedEntity {
    #[pyo3(get)]
    name: String,
    #[pyo3(get)]
    data: BTreeMap<String, String>,
}

impl From<SpecSavedEntity> for PySavedEntity {
    fn from(entity: SpecSavedEntity) -> Self {
        Self {
            name: entity.name,
            data: entity.data,
        }
    }
}

#[pyclass(name = "FieldDefinition")]
#[derive(Debug, Clone)]
struct PyFieldDefinition {
    #[pyo3(get)]
    id: String,
    #[pyo3(get)]
    key: String,
    #[pyo3(get)]
    label: String,
    #[pyo3(get)]
    field_type: String,
    #[pyo3(get)]
    required: bool,
    #[pyo3(get)]
    options: Vec<String>,
    #[pyo3(get)]
    description: Option<String>,
    #[pyo3(get)]
    placeholder: Option<String>,
    #[pyo3(get)]
    category: Option<String>,
}

impl PyFieldDefinition {
    fn from_catalog(catalog: &FieldCatalog, field: &SpecFieldDefinition) -> Self {
        Self {
            id: field.id.clone(),
            key: normalize_field_id(&field.id),
            label: field.label.clone(),
            field_type: match field.field_type {
                EnumFieldType::Alphanumerical => "alphanumerical",
                EnumFieldType::Country => "country",
                EnumFieldType::ClosedOptions => "closedOptions",
                EnumFieldType::Date => "date",
            }
            .to_string(),
            required: field.required,
            options: field.options.clone().unwrap_or_default(),
            description: field.description.clone(),
            placeholder: field.placeholder.clone(),
            category: catalog
                .category_of(&field.id)
                .map(|category| category.to_string()),
        }
    }
}

#[pyclass(name = "FormSession")]
struct PyFormSession {
    #[pyo3(get)]
    dir_export: String,
    inner: FormSession<FileSlotStorage>,
}

#[pymethods]
impl PyFormSession {
    #[new]
    #[pyo3(signature = (file_config = None, dir_storage = None, key_slot = None, dir_export = None))]
    fn new(
        file_config: Option<PathBuf>,
        dir_storage: Option<PathBuf>,
        key_slot: Option<String>,
        dir_export: Option<PathBuf>,
    ) -> PyResult<Self> {
        let mut cfg = match file_config {
            Some(path) => SpecEntikitConfig::from_toml_file(&path).map_err(map_entity_error)?,
            None => SpecEntikitConfig::from_env(),
        };
        if let Some(val) = dir_storage {
            cfg.dir_storage = val;
        }
        if let Some(val) = key_slot {
            cfg.key_storage_slot = val;
        }
        if let Some(val) = dir_export {
            cfg.dir_export = val;
        }

        let catalog = Arc::new(cfg.load_field_catalog().map_err(map_entity_error)?);
        let repository = EntityRepository::with_slot(
            FileSlotStorage::new(cfg.dir_storage.clone()),
            cfg.key_storage_slot.clone(),
        );
        Ok(Self {
            dir_export: cfg.dir_export.to_string_lossy().to_string(),
            inner: FormSession::new(catalog, repository),
        })
    }

    fn fields(&self) -> Vec<PyFieldDefinition> {
        let catalog = self.inner.catalog();
        catalog
            .fields()
            .iter()
            .map(|field| PyFieldDefinition::from_catalog(catalog, field))
            .collect()
    }

    #[getter]
    fn entity_name(&self) -> String {
        self.inner.entity_name().to_string()
    }

    fn values(&self) -> BTreeMap<String, String> {
        self.inner.values().clone()
    }

    fn field_value(&self, field_id: &str) -> Option<String> {
        self.inner.field_value(field_id).map(ToString::to_string)
    }

    fn set_field(&mut self, field_id: &str, value: String) {
        self.inner.set_field(field_id, value);
    }

    fn rename_entity(&mut self, name_new: String) {
        self.inner.rename_entity(name_new);
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn missing_required_fields(&self) -> Vec<String> {
        self.inner
            .missing_required_fields()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    fn begin_name_edit(&mut self) {
        self.inner.begin_name_edit();
    }

    fn set_name_draft(&mut self, name_draft: String) {
        self.inner.set_name_draft(name_draft);
    }

    fn commit_name_edit(&mut self) {
        self.inner.commit_name_edit();
    }

    fn cancel_name_edit(&mut self) {
        self.inner.cancel_name_edit();
    }

    /// `(if_editing, name_draft)`
    fn name_edit_state(&self) -> (bool, String) {
        let state = self.inner.name_edit_state();
        (state.if_editing, state.name_draft.clone())
    }

    fn submit(&mut self) -> PyResult<PySavedEntity> {
        self.inner
            .submit()
            .map(PySavedEntity::from)
            .map_err(map_entity_error)
    }

    fn load_entity(&mut self, name: &str) -> bool {
        self.inner.load_entity(name)
    }

    fn saved_entity_names(&mut self) -> Vec<String> {
        self.inner.saved_entity_names()
    }

    fn refresh_saved_entities(&mut self) -> Vec<PySavedEntity> {
        self.inner
            .refresh_saved_entities()
            .iter()
            .cloned()
            .map(PySavedEntity::from)
            .collect()
    }

    fn drain_notices(&mut self) -> Vec<PyNotice> {
        self.inner
            .drain_notices()
            .into_iter()
            .map(PyNotice::from)
            .collect()
    }

    /// Export the record being edited; returns the written path.
    #[pyo3(signature = (dir_export = None))]
    fn export_current(&self, py: Python<'_>, dir_export: Option<PathBuf>) -> PyResult<String> {
        let l_records = vec![self.inner.values().clone()];
        self.export(py, l_records, dir_export)
    }

    /// Export every saved entity; returns the written path.
    #[pyo3(signature = (dir_export = None))]
    fn export_all(&mut self, py: Python<'_>, dir_export: Option<PathBuf>) -> PyResult<String> {
        let l_records: Vec<ValueRecord> = self
            .inner
            .refresh_saved_entities()
            .iter()
            .map(|saved| saved.data.clone())
            .collect();
        self.export(py, l_records, dir_export)
    }
}

impl PyFormSession {
    fn export(
        &self,
        py: Python<'_>,
        records: Vec<ValueRecord>,
        dir_export: Option<PathBuf>,
    ) -> PyResult<String> {
        let catalog = Arc::clone(self.inner.catalog());
        let dir_out = dir_export.unwrap_or_else(|| PathBuf::from(&self.dir_export));
        let date = Local::now().date_naive();

        let path_file_out = py
            .allow_threads(|| export_records_to_dir(&catalog, &records, &dir_out, date))
            .map_err(map_export_error)?;
        Ok(path_file_out.to_string_lossy().to_string())
    }
}

/// Serialize `records` with the default catalog (or `file_catalog`) into XLSX bytes.
#[pyfunction(name = "export_records_to_bytes")]
#[pyo3(signature = (records, file_catalog = None))]
fn export_records_to_bytes_py<'py>(
    py: Python<'py>,
    records: Vec<BTreeMap<String, String>>,
    file_catalog: Option<PathBuf>,
) -> PyResult<Bound<'py, PyBytes>> {
    let catalog = load_catalog(file_catalog)?;
    let v_buffer = py
        .allow_threads(|| export_records_to_buffer(&catalog, &records))
        .map_err(map_export_error)?;
    Ok(PyBytes::new(py, &v_buffer))
}

#[pyfunction(name = "normalize_field_id")]
fn normalize_field_id_py(field_id: &str) -> String {
    normalize_field_id(field_id)
}

/// Install the global subscriber. Returns `False` when one already exists.
#[pyfunction(name = "init_logging")]
#[pyo3(signature = (filter = None, format = None))]
fn init_logging_py(filter: Option<String>, format: Option<&str>) -> PyResult<bool> {
    let mut options = SpecLogOptions::from_env();
    if let Some(val) = filter {
        options.filter = val;
    }
    if let Some(val) = format {
        options.format = EnumLogFormat::parse(val).ok_or_else(|| {
            PyValueError::new_err(format!(
                "Invalid log format: `{val}`. Expected one of: ['pretty', 'json']"
            ))
        })?;
    }
    match init_logging(&options) {
        Ok(()) => Ok(true),
        Err(LogError::AlreadyInitialized(_)) => Ok(false),
        Err(err) => Err(PyValueError::new_err(err.to_string())),
    }
}

fn load_catalog(file_catalog: Option<PathBuf>) -> PyResult<FieldCatalog> {
    let cfg = SpecEntikitConfig {
        file_catalog,
        ..SpecEntikitConfig::default()
    };
    cfg.load_field_catalog().map_err(map_entity_error)
}

fn map_entity_error(exception: EntityError) -> PyErr {
    match exception {
        EntityError::Persistence { .. } | EntityError::Io(_) => {
            PyOSError::new_err(exception.to_string())
        }
        _ => PyValueError::new_err(exception.to_string()),
    }
}

fn map_export_error(exception: ExportError) -> PyErr {
    match exception {
        ExportError::Io(_) => PyOSError::new_err(exception.to_string()),
        _ => PyRuntimeError::new_err(exception.to_string()),
    }
}

#[pymodule]
fn _entikit_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyNotice>()?;
    module.add_class::<PySavedEntity>()?;
    module.add_class::<PyFieldDefinition>()?;
    module.add_class::<PyFormSession>()?;
    module.add_function(wrap_pyfunction!(export_records_to_bytes_py, module)?)?;
    module.add_function(wrap_pyfunction!(normalize_field_id_py, module)?)?;
    module.add_function(wrap_pyfunction!(init_logging_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
