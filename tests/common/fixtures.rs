//! In-process warehouse backed by an in-memory bucket, and gzip helpers

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use redshift_unload::{Error, Result, Warehouse};

/// Bucket name used by every fixture
pub const BUCKET: &str = "unload-test";

/// Warehouse stand-in: answers probes with fixed columns and, on `UNLOAD`,
/// writes its partitions into the bucket under the prefix of the `TO` clause.
pub struct InMemoryWarehouse {
    store: Arc<InMemory>,
    columns: Vec<String>,
    partitions: Vec<(String, Vec<u8>)>,
    statements: Mutex<Vec<String>>,
}

impl InMemoryWarehouse {
    /// Warehouse whose query yields `columns` and unloads `partitions` (name, body)
    pub fn new(store: Arc<InMemory>, columns: &[&str], partitions: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            store,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            partitions,
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Statements executed so far
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn probe_columns(&self, _query: &str) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        self.statements.lock().unwrap().push(statement.to_string());

        let target = format!("TO 's3://{}/", BUCKET);
        let start = statement.find(&target).ok_or_else(|| Error::Query {
            message: format!("unexpected destination in {}", statement),
        })? + target.len();
        let end = start + statement[start..].find('\'').unwrap();
        let prefix = statement[start..end].to_string();

        for (name, body) in &self.partitions {
            let location = ObjectPath::parse(format!("{}{}", prefix, name)).unwrap();
            self.store
                .put(&location, body.clone().into())
                .await
                .map_err(|e| Error::Query {
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// Gzip `data` into a single member
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Decode every gzip member of the file at `path`
pub fn gunzip_file(path: &Path) -> String {
    let raw = std::fs::read(path).unwrap();
    let mut out = String::new();
    MultiGzDecoder::new(raw.as_slice())
        .read_to_string(&mut out)
        .unwrap();
    out
}

/// `count` partitions named like Redshift slices, each holding `rows` CSV rows
pub fn partitions(count: usize, rows: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|slice| {
            let body: String = (0..rows)
                .map(|row| format!("\"{}\",\"row-{}\"\n", slice, row))
                .collect();
            (format!("{:04}_part_00.gz", slice), gzip(body.as_bytes()))
        })
        .collect()
}
