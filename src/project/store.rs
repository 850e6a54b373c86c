//! Project persistence boundary
//!
//! The store owns the record lifecycle; the rest of the crate only reads
//! and patches fields. Writes are last-writer-wins.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{NewProject, Project, SaveInputs};
use crate::error::{FormIoError, Result};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a new project; names are unique
    async fn create(&self, new: NewProject) -> Result<Project>;

    async fn get(&self, id: Uuid) -> Result<Project>;

    /// All projects, newest first
    async fn list(&self) -> Result<Vec<Project>>;

    /// Apply a partial update and return the stored record
    async fn save_inputs(&self, id: Uuid, patch: SaveInputs) -> Result<Project>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

pub(crate) fn project_not_found(id: Uuid) -> FormIoError {
    FormIoError::not_found(format!("Project {} not found", id))
}

pub(crate) fn duplicate_name(name: &str) -> FormIoError {
    FormIoError::Conflict(format!("A project named '{}' already exists", name))
}

/// Process-local store used when no database is configured
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create(&self, new: NewProject) -> Result<Project> {
        let project = Project::from_new(new);
        let mut projects = self.projects.write().await;
        if projects.values().any(|p| p.name == project.name) {
            return Err(duplicate_name(&project.name));
        }
        projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get(&self, id: Uuid) -> Result<Project> {
        self.projects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| project_not_found(id))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.read().await.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn save_inputs(&self, id: Uuid, patch: SaveInputs) -> Result<Project> {
        let mut projects = self.projects.write().await;
        let project = projects.get_mut(&id).ok_or_else(|| project_not_found(id))?;
        project.apply(patch);
        Ok(project.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.projects
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| project_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{ParamValue, ParameterMap};

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryProjectStore::new();
        let created = store.create(NewProject::named("Harbour Block")).await.unwrap();

        assert_eq!(store.get(created.id).await.unwrap(), created);
        assert_eq!(store.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let store = InMemoryProjectStore::new();
        store.create(NewProject::named("A")).await.unwrap();
        let err = store.create(NewProject::named("A")).await.unwrap_err();
        assert!(matches!(err, FormIoError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_save_inputs_last_writer_wins() {
        let store = InMemoryProjectStore::new();
        let project = store.create(NewProject::named("A")).await.unwrap();

        for width in [20000.0, 25000.0] {
            let mut inputs = ParameterMap::new();
            inputs.insert("podium_width".to_string(), ParamValue::Numeric(width));
            store
                .save_inputs(
                    project.id,
                    SaveInputs {
                        inputs: Some(inputs),
                        ..SaveInputs::default()
                    },
                )
                .await
                .unwrap();
        }

        let stored = store.get(project.id).await.unwrap();
        assert_eq!(stored.inputs["podium_width"], ParamValue::Numeric(25000.0));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let store = InMemoryProjectStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(FormIoError::NotFound(_))
        ));
        assert!(matches!(
            store.save_inputs(id, SaveInputs::default()).await,
            Err(FormIoError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(id).await,
            Err(FormIoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_delete() {
        let store = InMemoryProjectStore::new();
        let first = store.create(NewProject::named("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create(NewProject::named("second")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        store.delete(first.id).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
