//! An [`ArchiveReader`] over rows held in memory, for embedding and tests.

use crate::archive::error::ArchiveError;
use crate::archive::{ArchiveConnection, ArchiveReader, ArchiveTable, ScanFilter};
use crate::tidy::cell::WideRow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    tables: Arc<HashMap<ArchiveTable, Vec<WideRow>>>,
    open_connections: Arc<AtomicUsize>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: ArchiveTable, rows: Vec<WideRow>) -> Self {
        Arc::make_mut(&mut self.tables).insert(table, rows);
        self
    }

    /// Connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveReader for MemoryArchive {
    async fn open(&self) -> Result<Box<dyn ArchiveConnection>, ArchiveError> {
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            tables: Arc::clone(&self.tables),
            open_connections: Arc::clone(&self.open_connections),
        }))
    }
}

struct MemoryConnection {
    tables: Arc<HashMap<ArchiveTable, Vec<WideRow>>>,
    open_connections: Arc<AtomicUsize>,
}

#[async_trait]
impl ArchiveConnection for MemoryConnection {
    async fn scan(
        &mut self,
        table: ArchiveTable,
        filter: &ScanFilter,
    ) -> Result<Vec<WideRow>, ArchiveError> {
        Ok(self
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.matches(table, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), ArchiveError> {
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
