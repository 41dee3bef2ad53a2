// lib/src/catalog.rs

use std::sync::Arc;

use tracing::info;

use models::identifiers::RecordId;
use models::medical::{MedicalTest, MedicalTestPatch, NewMedicalTest};

use crate::errors::{LabError, Result};
use crate::storage_engine::LabStorageEngine;

/// Medical test catalog. Titles are unique regardless of case.
#[derive(Clone)]
pub struct Catalog {
    storage: Arc<dyn LabStorageEngine>,
}

impl Catalog {
    pub fn new(storage: Arc<dyn LabStorageEngine>) -> Self {
        Self { storage }
    }

    pub async fn create_test(&self, input: NewMedicalTest) -> Result<MedicalTest> {
        let test = MedicalTest::new(input)?;
        self.storage.add_medical_test(&test).await?;
        info!(id = %test.id, title = %test.title, "Medical test created");
        Ok(test)
    }

    pub async fn list_tests(&self) -> Result<Vec<MedicalTest>> {
        self.storage.list_medical_tests().await
    }

    pub async fn get_test(&self, id: &RecordId) -> Result<MedicalTest> {
        self.storage
            .get_medical_test(id)
            .await?
            .ok_or_else(|| LabError::NotFound(format!("Medical test {} not found", id)))
    }

    pub async fn update_test(&self, id: &RecordId, patch: MedicalTestPatch) -> Result<MedicalTest> {
        let updated = self
            .storage
            .update_medical_test(id, &|record: &mut MedicalTest| -> Result<()> {
                Ok(record.apply(&patch)?)
            })
            .await?;
        info!(id = %updated.id, "Medical test updated");
        Ok(updated)
    }

    pub async fn delete_test(&self, id: &RecordId) -> Result<MedicalTest> {
        let removed = self
            .storage
            .delete_medical_test(id)
            .await?
            .ok_or_else(|| LabError::NotFound(format!("Medical test {} not found", id)))?;
        info!(id = %removed.id, title = %removed.title, "Medical test deleted");
        Ok(removed)
    }

    /// Resolves every id in order. Any unknown id fails the whole lookup.
    pub async fn resolve(&self, ids: &[RecordId]) -> Result<Vec<MedicalTest>> {
        let mut tests = Vec::with_capacity(ids.len());
        for id in ids {
            tests.push(self.get_test(id).await?);
        }
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::InMemoryStorage;
    use models::medical::NormalRange;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(InMemoryStorage::new()))
    }

    fn new_test(title: &str, price: f64) -> NewMedicalTest {
        NewMedicalTest {
            title: title.to_string(),
            image: None,
            price,
            has_offer: false,
            offer_price: None,
            instructions: vec!["Fasting for 8 hours".to_string()],
            normal_range: NormalRange { min: 70.0, max: 100.0, unit: "mg/dL".to_string() },
        }
    }

    #[tokio::test]
    async fn duplicate_title_ignores_case() {
        let catalog = catalog();
        catalog.create_test(new_test("Fasting Glucose", 50.0)).await.unwrap();
        let err = catalog.create_test(new_test("fasting glucose ", 60.0)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(catalog.list_tests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offer_is_checked_against_effective_price() {
        let catalog = catalog();
        let test = catalog.create_test(new_test("CBC", 100.0)).await.unwrap();

        let patch = MedicalTestPatch { has_offer: Some(true), offer_price: Some(120.0), ..Default::default() };
        let err = catalog.update_test(&test.id, patch).await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));

        let patch = MedicalTestPatch {
            price: Some(150.0),
            has_offer: Some(true),
            offer_price: Some(120.0),
            ..Default::default()
        };
        let updated = catalog.update_test(&test.id, patch).await.unwrap();
        assert_eq!(updated.offer_price, Some(120.0));
    }

    #[tokio::test]
    async fn resolve_fails_on_unknown_id() {
        let catalog = catalog();
        let test = catalog.create_test(new_test("CBC", 100.0)).await.unwrap();
        let resolved = catalog.resolve(&[test.id]).await.unwrap();
        assert_eq!(resolved[0].price, 100.0);
        let err = catalog.resolve(&[test.id, RecordId::new()]).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_unknown_test_is_not_found() {
        let err = catalog().delete_test(&RecordId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
