use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{CollectionSchema, PersonRecord, StoreError, VectorCollection};

/// 进程内的集合，用于试运行
pub struct MemoryCollection {
    schema: CollectionSchema,
    records: Mutex<Vec<PersonRecord>>,
}

impl MemoryCollection {
    pub fn new(schema: CollectionSchema) -> Self {
        Self { schema, records: Mutex::new(vec![]) }
    }

    pub fn records(&self) -> Vec<PersonRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn records_of(&self, person_name: &str) -> Vec<PersonRecord> {
        self.records().into_iter().filter(|r| r.person_name == person_name).collect()
    }
}

#[async_trait]
impl VectorCollection for MemoryCollection {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    async fn recreate(&self) -> Result<(), StoreError> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    async fn insert(&self, person_name: &str, vector: Vec<f32>) -> Result<(), StoreError> {
        self.schema.check_dimension(&vector)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PersonRecord { person_name: person_name.to_owned(), vector });
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap_or_else(PoisonError::into_inner).len() as u64)
    }
}
