//! `entikit_io_xlsx` v1:
//! Workbook sink for exported entity sheets.
//!
//! Architecture:
//! - `conf`   : Excel limits, export naming and default presets
//! - `spec`   : format/policy/report models
//! - `error`  : error taxonomy
//! - `util`   : pure helper functions
//! - `frame`  : sheet rows -> polars DataFrames
//! - `writer` : buffered `rust_xlsxwriter` kernel
//! - `export` : sink trait and export service
pub mod conf;
pub mod error;
pub mod export;
pub mod frame;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_EXPORT_FILE_EXT, C_EXPORT_FILE_PREFIX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL, derive_default_xlsx_formats,
};
pub use error::{ExportError, Result};
pub use export::{
    WorkbookSink, export_records_to_buffer, export_records_to_dir,
    export_records_to_dir_with_sink, export_records_with_sink, spawn_export_to_dir,
    write_buffer_to_dir, write_export_sheets,
};
pub use frame::{derive_data_frame, derive_header_frame};
pub use spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice,
    SpecXlsxReport, SpecXlsxWriteOptions,
};
pub use util::{derive_export_file_name, plan_sheet_slices, sanitize_sheet_name};
pub use writer::{SpecXlsxSheetWriteOptions, XlsxWriter};
