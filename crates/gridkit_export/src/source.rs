//! Batched data sources: the pull state machine uniting paged-provider
//! iteration and fixed-size query-cursor iteration, plus DataFrame-backed
//! implementations of both contracts.

use std::io::Cursor;

use log::{debug, warn};
use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};

use gridkit_sheet::EnumCellValue;

use crate::error::ExportError;
use crate::spec::{EnumRecordKey, SpecRecord};

////////////////////////////////////////////////////////////////////////////////
// #region SourceContracts

/// Pagination snapshot reported by a paged provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecPageInfo {
    /// Total page count.
    pub n_pages: usize,
    /// Current page index (zero-based).
    pub n_page_current: usize,
}

/// A provider holding one prepared page of records at a time.
pub trait PagedDataProvider {
    /// Pagination snapshot; `None` means pagination is disabled.
    fn page_info(&self) -> Option<SpecPageInfo>;

    /// Select the page that the next [`Self::prepare`] call materializes.
    fn set_page(&mut self, n_page: usize);

    /// Materialize the current page's models and keys.
    fn prepare(&mut self, if_force_refresh: bool) -> Result<(), String>;

    /// Prepared models of the current page.
    fn models(&self) -> Vec<SpecRecord>;

    /// Prepared keys of the current page, parallel to [`Self::models`].
    fn keys(&self) -> Vec<EnumRecordKey>;
}

/// Forward-only iterator of record batches produced by a batch query.
pub type TypeBatchIter = Box<dyn Iterator<Item = Result<Vec<SpecRecord>, String>> + Send>;

/// A query supporting restartable fixed-size batch iteration.
pub trait BatchQuery {
    /// Start a fresh batch iteration with the given window size.
    fn batch(&self, size_batch: usize) -> TypeBatchIter;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchSource

/// One pulled batch: records plus parallel keys. An empty key list means
/// the consumer synthesizes positional keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecBatch {
    /// Records of this batch, in source order.
    pub l_models: Vec<SpecRecord>,
    /// Keys parallel to `l_models`; may be empty for cursor batches.
    pub l_keys: Vec<EnumRecordKey>,
}

/// Iteration state of a [`BatchSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBatchState {
    /// No pull has happened yet.
    NotStarted,
    /// Paged variant: next page to emit.
    Paging(usize),
    /// Cursor variant: the query iterator is live.
    Iterating,
    /// End of data was reported; the cursor is torn down.
    Exhausted,
}

enum EnumBatchVariant {
    Paged(Box<dyn PagedDataProvider>),
    Query {
        query: Box<dyn BatchQuery>,
        size_batch: usize,
        iter: Option<TypeBatchIter>,
    },
}

/// Pull-based batch iteration over one data source. Repeated
/// [`BatchSource::next_batch`] calls return successive disjoint,
/// order-preserving record slices, terminating with `Ok(None)`; at most one
/// batch is held in memory at a time.
pub struct BatchSource {
    variant: EnumBatchVariant,
    state: EnumBatchState,
}

impl BatchSource {
    /// Batch over a paged provider.
    pub fn new_paged(provider: Box<dyn PagedDataProvider>) -> Self {
        Self {
            variant: EnumBatchVariant::Paged(provider),
            state: EnumBatchState::NotStarted,
        }
    }

    /// Batch over a query cursor with fixed window size.
    pub fn new_query(query: Box<dyn BatchQuery>, size_batch: usize) -> Self {
        Self {
            variant: EnumBatchVariant::Query {
                query,
                size_batch: usize::max(1, size_batch),
                iter: None,
            },
            state: EnumBatchState::NotStarted,
        }
    }

    /// Build from optional source slots. The query wins when both are
    /// configured; configuring neither is an error.
    pub fn from_config(
        provider: Option<Box<dyn PagedDataProvider>>,
        query: Option<Box<dyn BatchQuery>>,
        size_batch: usize,
    ) -> Result<Self, ExportError> {
        match (query, provider) {
            (Some(query), provider) => {
                if provider.is_some() {
                    warn!("both a query and a data provider are configured; the query wins");
                }
                Ok(Self::new_query(query, size_batch))
            }
            (None, Some(provider)) => Ok(Self::new_paged(provider)),
            (None, None) => Err(ExportError::Configuration(
                "no data source configured: set a data provider or a query".to_string(),
            )),
        }
    }

    /// Current iteration state.
    pub fn state(&self) -> EnumBatchState {
        self.state
    }

    /// Tear down the source, handing back the underlying provider or query
    /// so a caller can reuse it for a later iteration. Any live cursor is
    /// dropped.
    pub fn into_parts(
        self,
    ) -> (
        Option<Box<dyn PagedDataProvider>>,
        Option<Box<dyn BatchQuery>>,
    ) {
        match self.variant {
            EnumBatchVariant::Paged(provider) => (Some(provider), None),
            EnumBatchVariant::Query { query, .. } => (None, Some(query)),
        }
    }

    /// Pull the next batch; `Ok(None)` signals end of data.
    pub fn next_batch(&mut self) -> Result<Option<SpecBatch>, ExportError> {
        if self.state == EnumBatchState::Exhausted {
            return Ok(None);
        }

        match &mut self.variant {
            EnumBatchVariant::Paged(provider) => {
                let n_page = match self.state {
                    EnumBatchState::NotStarted => 0,
                    EnumBatchState::Paging(n_page) => n_page,
                    _ => {
                        self.state = EnumBatchState::Exhausted;
                        return Ok(None);
                    }
                };

                match provider.page_info() {
                    None | Some(SpecPageInfo { n_pages: 0, .. }) => {
                        // Pagination disabled or empty: the full model set is
                        // emitted exactly once.
                        if n_page == 0 {
                            provider.prepare(false).map_err(ExportError::DataSource)?;
                            let batch = SpecBatch {
                                l_models: provider.models(),
                                l_keys: provider.keys(),
                            };
                            debug!("paged pull: full set, {} models", batch.l_models.len());
                            self.state = EnumBatchState::Paging(1);
                            Ok(Some(batch))
                        } else {
                            self.state = EnumBatchState::Exhausted;
                            Ok(None)
                        }
                    }
                    Some(info) => {
                        if n_page < info.n_pages {
                            provider.set_page(n_page);
                            provider.prepare(true).map_err(ExportError::DataSource)?;
                            let batch = SpecBatch {
                                l_models: provider.models(),
                                l_keys: provider.keys(),
                            };
                            debug!(
                                "paged pull: page {n_page}/{}, {} models",
                                info.n_pages,
                                batch.l_models.len()
                            );
                            self.state = EnumBatchState::Paging(n_page + 1);
                            Ok(Some(batch))
                        } else {
                            self.state = EnumBatchState::Exhausted;
                            Ok(None)
                        }
                    }
                }
            }
            EnumBatchVariant::Query {
                query,
                size_batch,
                iter,
            } => {
                if self.state == EnumBatchState::NotStarted {
                    *iter = Some(query.batch(*size_batch));
                    self.state = EnumBatchState::Iterating;
                }

                match iter.as_mut().and_then(|cursor| cursor.next()) {
                    Some(Ok(l_models)) => {
                        debug!("cursor pull: {} models", l_models.len());
                        Ok(Some(SpecBatch {
                            l_models,
                            l_keys: Vec::new(),
                        }))
                    }
                    Some(Err(err)) => {
                        self.state = EnumBatchState::Exhausted;
                        *iter = None;
                        Err(ExportError::DataSource(err))
                    }
                    None => {
                        self.state = EnumBatchState::Exhausted;
                        *iter = None;
                        Ok(None)
                    }
                }
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameSources

/// Paged provider over an in-memory DataFrame.
pub struct DataFrameProvider {
    df: DataFrame,
    size_page: Option<usize>,
    key_field: Option<String>,
    n_page: usize,
    l_models: Vec<SpecRecord>,
    l_keys: Vec<EnumRecordKey>,
}

impl DataFrameProvider {
    /// Provider with pagination disabled.
    pub fn new(df: DataFrame) -> Self {
        Self {
            df,
            size_page: None,
            key_field: None,
            n_page: 0,
            l_models: Vec::new(),
            l_keys: Vec::new(),
        }
    }

    /// Enable pagination with the given page size; zero disables it.
    pub fn with_page_size(mut self, size_page: usize) -> Self {
        if size_page == 0 {
            warn!("page size 0 disables pagination");
            self.size_page = None;
        } else {
            self.size_page = Some(size_page);
        }
        self
    }

    /// Use a record field as the key instead of positional indices.
    pub fn with_key_field(mut self, key_field: &str) -> Self {
        self.key_field = Some(key_field.to_string());
        self
    }
}

impl PagedDataProvider for DataFrameProvider {
    fn page_info(&self) -> Option<SpecPageInfo> {
        self.size_page.map(|size_page| SpecPageInfo {
            n_pages: self.df.height().div_ceil(size_page),
            n_page_current: self.n_page,
        })
    }

    fn set_page(&mut self, n_page: usize) {
        self.n_page = n_page;
    }

    fn prepare(&mut self, if_force_refresh: bool) -> Result<(), String> {
        if !if_force_refresh && !self.l_models.is_empty() {
            return Ok(());
        }

        let (n_row_offset, df_window) = match self.size_page {
            None => (0, self.df.clone()),
            Some(size_page) => {
                let n_row_offset = self.n_page * size_page;
                (
                    n_row_offset,
                    self.df.slice(n_row_offset as i64, size_page),
                )
            }
        };

        self.l_models = derive_records_from_dataframe(&df_window)?;
        self.l_keys = self
            .l_models
            .iter()
            .enumerate()
            .map(|(n_idx, record)| derive_record_key(record, self.key_field.as_deref(), n_row_offset + n_idx))
            .collect();
        Ok(())
    }

    fn models(&self) -> Vec<SpecRecord> {
        self.l_models.clone()
    }

    fn keys(&self) -> Vec<EnumRecordKey> {
        self.l_keys.clone()
    }
}

fn derive_record_key(
    record: &SpecRecord,
    key_field: Option<&str>,
    n_idx_global: usize,
) -> EnumRecordKey {
    match key_field.and_then(|field| record.value_of(field)) {
        Some(value) => EnumRecordKey::Value(value.clone()),
        None => EnumRecordKey::Index(n_idx_global),
    }
}

/// Batch query over an in-memory DataFrame with fixed-size windowing.
pub struct DataFrameQuery {
    df: DataFrame,
}

impl DataFrameQuery {
    /// Query over an already materialized frame.
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Query over a Polars IPC payload.
    pub fn from_ipc_bytes(v_ipc_df: &[u8]) -> Result<Self, String> {
        let df = IpcReader::new(Cursor::new(v_ipc_df))
            .finish()
            .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))?;
        Ok(Self { df })
    }
}

impl BatchQuery for DataFrameQuery {
    fn batch(&self, size_batch: usize) -> TypeBatchIter {
        let df = self.df.clone();
        let l_chunks = generate_row_chunks(df.height(), usize::max(1, size_batch));
        Box::new(l_chunks.into_iter().map(move |(n_row_start, n_rows)| {
            derive_records_from_dataframe(&df.slice(n_row_start as i64, n_rows))
        }))
    }
}

/// Generate `(row_start, row_len)` chunks for `n_rows_total`.
fn generate_row_chunks(n_rows_total: usize, size_rows_chunk: usize) -> Vec<(usize, usize)> {
    let mut l_chunks = Vec::new();
    let mut n_row_cursor = 0;
    while n_row_cursor < n_rows_total {
        let n_rows_per_chunk = usize::min(size_rows_chunk, n_rows_total - n_row_cursor);
        l_chunks.push((n_row_cursor, n_rows_per_chunk));
        n_row_cursor += n_rows_per_chunk;
    }
    l_chunks
}

/// Materialize every row of `df` as an ordered record.
pub fn derive_records_from_dataframe(df: &DataFrame) -> Result<Vec<SpecRecord>, String> {
    let l_names: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let l_cols = df.get_columns();

    let mut l_records = Vec::with_capacity(df.height());
    for n_idx_row in 0..df.height() {
        let mut l_fields = Vec::with_capacity(l_names.len());
        for (n_idx_col, c_name) in l_names.iter().enumerate() {
            let value = l_cols[n_idx_col]
                .get(n_idx_row)
                .map_err(|err| format!("Failed to access cell value: {err}"))?;
            l_fields.push((c_name.clone(), derive_cell_value_from_any_value(value)));
        }
        l_records.push(SpecRecord::new(l_fields));
    }
    Ok(l_records)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::Boolean(val) => EnumCellValue::Bool(val),
        AnyValue::String(val) => EnumCellValue::Text(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::Text(val.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int128(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::Text(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
