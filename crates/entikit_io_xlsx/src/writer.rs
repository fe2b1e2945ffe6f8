//! Buffered XLSX writer kernel: DataFrames in, workbook bytes out.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::{debug, warn};

use entikit_entity::SpecExportSheet;

use crate::conf::{N_COLS_FREEZE_KEY, N_LEN_EXCEL_SHEET_NAME_MAX, derive_default_xlsx_formats};
use crate::error::{ExportError, Result};
use crate::export::WorkbookSink;
use crate::frame::{derive_data_frame, derive_header_frame, derive_text_from_any_value};
use crate::spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSlice,
    SpecXlsxReport, SpecXlsxWriteOptions,
};
use crate::util::{
    estimate_unicode_string_width, plan_sheet_slices, sanitize_sheet_name,
    validate_unique_columns,
};

/// Per-sheet call options.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    /// Number of frozen columns.
    pub col_freeze: usize,
    /// Frozen row index; defaults to header height when `None`.
    pub row_freeze: Option<usize>,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::close_to_buffer`]; nothing
/// touches the filesystem.
pub struct XlsxWriter {
    workbook: Workbook,
    fmt_text: SpecCellFormat,
    fmt_header: SpecCellFormat,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl Default for XlsxWriter {
    fn default() -> Self {
        let mut dict_fmt = derive_default_xlsx_formats();
        Self::new(
            dict_fmt.remove("text").unwrap_or_default(),
            dict_fmt.remove("header").unwrap_or_default(),
            SpecXlsxWriteOptions::default(),
        )
    }
}

impl XlsxWriter {
    pub fn new(
        fmt_text: SpecCellFormat,
        fmt_header: SpecCellFormat,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            workbook: Workbook::new(),
            fmt_text,
            fmt_header,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Serialize the workbook. Further writes are rejected.
    pub fn close_to_buffer(&mut self) -> Result<Vec<u8>> {
        if self.if_closed {
            return Err(ExportError::sink("Workbook already closed."));
        }
        let v_buffer = self.workbook.save_to_buffer()?;
        self.if_closed = true;
        debug!(bytes = v_buffer.len(), "workbook serialized");
        Ok(v_buffer)
    }

    /// Write one sheet from in-memory dataframes.
    ///
    /// `df_header` replaces the default header row (the column names) and must
    /// match `df_data` in width.
    pub fn write_sheet_from_dataframes(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        df_header: Option<&DataFrame>,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<()> {
        if self.if_closed {
            return Err(ExportError::sink("Cannot write after close."));
        }
        validate_policy_autofit(&options.policy_autofit)?;

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();

        let mut l_header_grid = vec![l_colnames_df];
        if let Some(df_header_custom) = df_header {
            if df_header_custom.height() == 0 {
                return Err(ExportError::sink(
                    "df_header must have >= 1 row (0-row header is not allowed).",
                ));
            }
            if df_header_custom.width() != n_width_df {
                return Err(ExportError::sink("df_header.width must equal df.width."));
            }
            l_header_grid = derive_string_grid_from_dataframe(df_header_custom)?;
        }
        let n_rows_header = l_header_grid.len();

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            n_height_df,
            n_width_df,
            n_rows_header,
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        )?;
        for c_warning in &report.warnings {
            warn!(sheet = sheet_name, "{c_warning}");
        }

        let n_row_freeze = options.row_freeze.unwrap_or(n_rows_header);
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);
        let fmt_body = derive_rust_xlsx_format(&self.fmt_text);

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique = self.derive_unique_sheet_name(&sheet_slice.sheet_name);
            let n_width_slice = sheet_slice.col_end_exclusive - sheet_slice.col_start_inclusive;
            let n_rows_slice = sheet_slice.row_end_exclusive - sheet_slice.row_start_inclusive;

            let worksheet = self.workbook.add_worksheet();
            worksheet.set_name(&sheet_name_unique)?;

            let l_header_grid_slice: Vec<Vec<String>> = l_header_grid
                .iter()
                .map(|row| {
                    row[sheet_slice.col_start_inclusive..sheet_slice.col_end_exclusive].to_vec()
                })
                .collect();

            let mut l_width_by_col_header = vec![0usize; n_width_slice];
            let mut l_width_by_col_body = vec![0usize; n_width_slice];
            for row in &l_header_grid_slice {
                for (n_idx_col, value) in row.iter().enumerate() {
                    l_width_by_col_header[n_idx_col] = usize::max(
                        l_width_by_col_header[n_idx_col],
                        estimate_unicode_string_width(value),
                    );
                }
            }

            write_header(worksheet, &l_header_grid_slice, &fmt_header)?;
            worksheet.set_freeze_panes(
                cast_row_num(n_row_freeze)?,
                cast_col_num(usize::min(options.col_freeze, n_width_slice))?,
            )?;

            let n_rows_inferred_max = options
                .policy_autofit
                .height_body_inferred_max
                .unwrap_or(usize::MAX);
            for n_idx_col_abs in sheet_slice.col_start_inclusive..sheet_slice.col_end_exclusive {
                let n_idx_col = n_idx_col_abs - sheet_slice.col_start_inclusive;
                let col = df_data.get_columns()[n_idx_col_abs]
                    .slice(sheet_slice.row_start_inclusive as i64, n_rows_slice);

                for n_row_local in 0..n_rows_slice {
                    let value = derive_text_from_any_value(col.get(n_row_local)?);
                    if n_row_local < n_rows_inferred_max {
                        l_width_by_col_body[n_idx_col] = usize::max(
                            l_width_by_col_body[n_idx_col],
                            estimate_unicode_string_width(&value),
                        );
                    }
                    write_cell_with_format(
                        worksheet,
                        n_rows_header + n_row_local,
                        n_idx_col,
                        &value,
                        &fmt_body,
                    )?;
                }
            }

            apply_autofit(
                worksheet,
                &options.policy_autofit,
                &l_width_by_col_header,
                &l_width_by_col_body,
            )?;

            debug!(
                sheet = %sheet_name_unique,
                rows = n_rows_slice,
                cols = n_width_slice,
                "sheet written"
            );
            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..sheet_slice
            });
        }

        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

impl WorkbookSink for XlsxWriter {
    /// Label row and field-id row on top, key column frozen.
    fn write_sheet(&mut self, sheet: &SpecExportSheet) -> Result<()> {
        let df_data = derive_data_frame(sheet)?;
        let df_header = derive_header_frame(sheet)?;
        let options = SpecXlsxSheetWriteOptions {
            col_freeze: N_COLS_FREEZE_KEY,
            row_freeze: None,
            policy_autofit: self.write_options.policy_autofit.clone(),
        };
        self.write_sheet_from_dataframes(&df_data, &sheet.sheet_name, Some(&df_header), &options)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.close_to_buffer()
    }
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<()> {
    if policy_autofit.width_cell_min == 0 {
        return Err(ExportError::sink("policy_autofit.width_cell_min must be >= 1."));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(ExportError::sink(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.",
        ));
    }
    Ok(())
}

fn apply_autofit(
    worksheet: &mut Worksheet,
    policy_autofit: &SpecAutofitCellsPolicy,
    l_width_by_col_header: &[usize],
    l_width_by_col_body: &[usize],
) -> Result<()> {
    let l_widths_final =
        derive_autofit_widths(policy_autofit, l_width_by_col_header, l_width_by_col_body);
    for (n_idx_col, n_width_final) in l_widths_final.into_iter().enumerate() {
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }
    Ok(())
}

/// Final column widths for `policy_autofit`; empty when autofit is disabled.
fn derive_autofit_widths(
    policy_autofit: &SpecAutofitCellsPolicy,
    l_width_by_col_header: &[usize],
    l_width_by_col_body: &[usize],
) -> Vec<usize> {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    let n_pad = policy_autofit.width_cell_padding;

    l_width_by_col_header
        .iter()
        .zip(l_width_by_col_body)
        .filter_map(|(n_width_header, n_width_body)| {
            let n_width_recorded = match policy_autofit.rule_columns {
                EnumAutofitColumnsRule::None => return None,
                EnumAutofitColumnsRule::Header => *n_width_header,
                EnumAutofitColumnsRule::Body => *n_width_body,
                EnumAutofitColumnsRule::All => usize::max(*n_width_header, *n_width_body),
            };
            Some(usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad)))
        })
        .collect()
}

fn derive_string_grid_from_dataframe(df: &DataFrame) -> Result<Vec<Vec<String>>> {
    let l_cols = df.get_columns();
    let mut l_grid = vec![vec![String::new(); df.width()]; df.height()];
    for (n_idx_row, l_row) in l_grid.iter_mut().enumerate() {
        for (n_idx_col, c_cell) in l_row.iter_mut().enumerate() {
            *c_cell = derive_text_from_any_value(l_cols[n_idx_col].get(n_idx_row)?);
        }
    }
    Ok(l_grid)
}

fn write_header(
    worksheet: &mut Worksheet,
    header_grid: &[Vec<String>],
    fmt_header: &Format,
) -> Result<()> {
    for (row_idx, row_values) in header_grid.iter().enumerate() {
        for (col_idx, cell_value) in row_values.iter().enumerate() {
            if cell_value.is_empty() {
                worksheet.write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, fmt_header)?;
            } else {
                worksheet.write_string_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    cell_value,
                    fmt_header,
                )?;
            }
        }
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &str,
    format: &Format,
) -> Result<()> {
    if value.is_empty() {
        worksheet.write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)?;
    } else {
        worksheet.write_string_with_format(
            cast_row_num(row_idx)?,
            cast_col_num(col_idx)?,
            value,
            format,
        )?;
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| ExportError::sink(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| ExportError::sink(format!("column index overflow: {value}")))
}
