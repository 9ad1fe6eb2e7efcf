use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One node invocation, as seen by telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: u64,
    pub run_id: String,
    pub node_name: String,
    pub signature_hash: String,
    pub input_tables: Vec<String>,
    pub output_table: String,
    pub input_rows: u64,
    pub output_rows: u64,
    pub status: String,
    pub error_kind: Option<String>,
    pub duration_ms: u64,
    pub metadata: HashMap<String, String>,
}

/// Trait for recording execution traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Default)]
pub struct MemoryTelemetry {
    traces: std::sync::Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<TraceEntry> {
        match self.traces.lock() {
            Ok(traces) => traces.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        match self.traces.lock() {
            Ok(mut traces) => traces.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

#[cfg(feature = "telemetry")]
pub use parquet_sink::ParquetTelemetry;

#[cfg(feature = "telemetry")]
mod parquet_sink {
    use super::{Telemetry, TraceEntry};
    use arrow::array::{ArrayRef, StringArray, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Buffers traces and writes them to a Parquet file on flush.
    ///
    /// Rows already in the file are kept; the file is rewritten through a
    /// sibling temporary file and renamed into place.
    pub struct ParquetTelemetry {
        path: PathBuf,
        pending: Mutex<Vec<TraceEntry>>,
    }

    impl ParquetTelemetry {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                pending: Mutex::new(Vec::new()),
            }
        }

        pub fn schema() -> SchemaRef {
            Arc::new(Schema::new(vec![
                Field::new("timestamp", DataType::UInt64, false),
                Field::new("run_id", DataType::Utf8, false),
                Field::new("node_name", DataType::Utf8, false),
                Field::new("signature_hash", DataType::Utf8, false),
                Field::new("input_tables", DataType::Utf8, false),
                Field::new("output_table", DataType::Utf8, false),
                Field::new("input_rows", DataType::UInt64, false),
                Field::new("output_rows", DataType::UInt64, false),
                Field::new("status", DataType::Utf8, false),
                Field::new("error_kind", DataType::Utf8, true),
                Field::new("duration_ms", DataType::UInt64, false),
                Field::new("metadata", DataType::Utf8, false),
            ]))
        }

        fn to_batch(entries: &[TraceEntry]) -> Result<RecordBatch, String> {
            let strings = |f: fn(&TraceEntry) -> String| -> ArrayRef {
                Arc::new(StringArray::from(entries.iter().map(f).collect::<Vec<_>>()))
            };
            let numbers = |f: fn(&TraceEntry) -> u64| -> ArrayRef {
                Arc::new(UInt64Array::from(entries.iter().map(f).collect::<Vec<_>>()))
            };
            let columns: Vec<ArrayRef> = vec![
                numbers(|e| e.timestamp),
                strings(|e| e.run_id.clone()),
                strings(|e| e.node_name.clone()),
                strings(|e| e.signature_hash.clone()),
                strings(|e| serde_json::to_string(&e.input_tables).unwrap_or_default()),
                strings(|e| e.output_table.clone()),
                numbers(|e| e.input_rows),
                numbers(|e| e.output_rows),
                strings(|e| e.status.clone()),
                Arc::new(StringArray::from(
                    entries
                        .iter()
                        .map(|e| e.error_kind.clone())
                        .collect::<Vec<Option<String>>>(),
                )),
                numbers(|e| e.duration_ms),
                strings(|e| serde_json::to_string(&e.metadata).unwrap_or_default()),
            ];
            RecordBatch::try_new(Self::schema(), columns).map_err(|e| e.to_string())
        }

        fn existing_batches(&self) -> Result<Vec<RecordBatch>, String> {
            if !self.path.exists() {
                return Ok(Vec::new());
            }
            let file = File::open(&self.path).map_err(|e| e.to_string())?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)
                .and_then(|builder| builder.build())
                .map_err(|e| e.to_string())?;
            reader
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())
        }

        fn write(&self, entries: &[TraceEntry]) -> Result<(), String> {
            let mut batches = self.existing_batches()?;
            batches.push(Self::to_batch(entries)?);

            let tmp = self.path.with_extension("parquet.tmp");
            let file = File::create(&tmp).map_err(|e| e.to_string())?;
            let mut writer =
                ArrowWriter::try_new(file, Self::schema(), None).map_err(|e| e.to_string())?;
            for batch in &batches {
                writer.write(batch).map_err(|e| e.to_string())?;
            }
            writer.close().map_err(|e| e.to_string())?;
            std::fs::rename(&tmp, &self.path).map_err(|e| e.to_string())
        }
    }

    impl Telemetry for ParquetTelemetry {
        fn record(&self, entry: TraceEntry) {
            match self.pending.lock() {
                Ok(mut pending) => pending.push(entry),
                Err(poisoned) => poisoned.into_inner().push(entry),
            }
        }

        fn flush(&self) {
            let entries: Vec<TraceEntry> = match self.pending.lock() {
                Ok(mut pending) => pending.drain(..).collect(),
                Err(poisoned) => poisoned.into_inner().drain(..).collect(),
            };
            if entries.is_empty() {
                return;
            }
            match self.write(&entries) {
                Ok(()) => log::debug!(
                    "Wrote {} trace entries to '{}'",
                    entries.len(),
                    self.path.display()
                ),
                Err(e) => log::warn!(
                    "Failed to write traces to '{}': {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}
