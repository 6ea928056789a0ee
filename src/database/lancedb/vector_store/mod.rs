
use crate::{SchemeError, config::Config};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "embeddings";

/// Vector index over the passage embeddings, backed by LanceDB.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

/// One embedding row. `chunk_pos` is the join key into the metadata store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub chunk_pos: u64,
    pub vector: Vec<f32>,
}

/// A nearest-neighbor hit, before the metadata join.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk_pos: u64,
    pub distance: f32,
    /// `1 - cosine distance`, higher is better.
    pub similarity_score: f32,
}

impl VectorStore {
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, SchemeError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SchemeError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: None,
        };

        if store.table_exists().await? {
            let dim = store.detect_existing_vector_dimension().await?;
            store.vector_dimension = Some(dim);
            debug!("Detected existing vector dimension: {}", dim);
        }

        Ok(store)
    }

    /// Drop any existing table and create an empty one with the given
    /// dimension. The build pipeline calls this before inserting rows, so an
    /// ingestion run always replaces the index wholesale.
    #[inline]
    pub async fn rebuild(&mut self, vector_dim: usize) -> Result<(), SchemeError> {
        if self.table_exists().await? {
            info!("Dropping existing embeddings table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| SchemeError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let schema = self.create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(vector_dim);
        info!("Embeddings table created with {} dimensions", vector_dim);
        Ok(())
    }

    /// Insert a batch of embedding rows.
    #[inline]
    pub async fn store_batch(&mut self, records: Vec<VectorRecord>) -> Result<(), SchemeError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to insert embeddings: {}", e)))?;

        debug!("Stored {} embeddings", records.len());
        Ok(())
    }

    /// Top-`limit` nearest neighbors of `query_vector` under cosine distance.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>, SchemeError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| SchemeError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    /// Total number of embedding rows; zero when no index has been built.
    #[inline]
    pub async fn count(&self) -> Result<u64, SchemeError> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Compact and reorganize the table after a build.
    #[inline]
    pub async fn optimize(&mut self) -> Result<(), SchemeError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to open table: {}", e)))?;

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to optimize table: {}", e)))?;

        debug!("Vector index optimization completed");
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool, SchemeError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize, SchemeError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to open existing table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(SchemeError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("chunk_pos", DataType::UInt64, false),
        ]))
    }

    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch, SchemeError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| SchemeError::Database("Vector dimension not set".to_string()))?;

        let mut ids = Vec::with_capacity(len);
        let mut chunk_positions = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(SchemeError::Database(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    vector_dim,
                    record.vector.len()
                )));
            }
            ids.push(record.id.as_str());
            chunk_positions.push(record.chunk_pos);
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    SchemeError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let schema = self.create_schema(vector_dim);
        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(UInt64Array::from(chunk_positions)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| SchemeError::Database(format!("Failed to create record batch: {}", e)))
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<VectorHit>, SchemeError> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| SchemeError::Database(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(self.parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search hits from stream", hits.len());
        Ok(hits)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<VectorHit>, SchemeError> {
        let num_rows = batch.num_rows();

        let chunk_positions = batch
            .column_by_name("chunk_pos")
            .ok_or_else(|| SchemeError::Database("Missing chunk_pos column".to_string()))?
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| SchemeError::Database("Invalid chunk_pos column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut hits = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            hits.push(VectorHit {
                chunk_pos: chunk_positions.value(row),
                distance,
                similarity_score: 1.0 - distance,
            });
        }

        Ok(hits)
    }
}
