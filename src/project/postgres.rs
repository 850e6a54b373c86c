//! PostgreSQL project store
//!
//! Geometry and inputs are JSONB columns; `type` is a lowercase VARCHAR.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{NewProject, Project, ProjectType, SaveInputs};
use super::store::{duplicate_name, project_not_found, ProjectStore};
use crate::error::{FormIoError, Result};

const UNIQUE_VIOLATION: &str = "23505";

const SELECT_COLUMNS: &str = r#"
    id, name, type, relative_location, site_bounds, site_envelope,
    blocks_envelope, inputs, map_style, created_at
"#;

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    project_type: ProjectType,
    relative_location: serde_json::Value,
    site_bounds: serde_json::Value,
    site_envelope: serde_json::Value,
    blocks_envelope: serde_json::Value,
    inputs: serde_json::Value,
    map_style: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = FormIoError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            name: row.name,
            project_type: row.project_type,
            relative_location: row.relative_location,
            site_bounds: row.site_bounds,
            site_envelope: row.site_envelope,
            blocks_envelope: row.blocks_envelope,
            inputs: serde_json::from_value(row.inputs)?,
            map_style: row.map_style,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `projects` table if this database has never seen one
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                type VARCHAR(50) NOT NULL DEFAULT 'residential',
                relative_location JSONB NOT NULL DEFAULT '{}'::jsonb,
                site_bounds JSONB NOT NULL DEFAULT '{}'::jsonb,
                site_envelope JSONB NOT NULL DEFAULT '{}'::jsonb,
                blocks_envelope JSONB NOT NULL DEFAULT '{}'::jsonb,
                inputs JSONB NOT NULL DEFAULT '{}'::jsonb,
                map_style VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn select_where(clause: &str) -> String {
    format!("SELECT {} FROM projects WHERE {}", SELECT_COLUMNS, clause)
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn create(&self, new: NewProject) -> Result<Project> {
        let project = Project::from_new(new);
        let inputs = serde_json::to_value(&project.inputs)?;

        let result = sqlx::query(
            r#"
            INSERT INTO projects
                (id, name, type, relative_location, site_bounds, site_envelope,
                 blocks_envelope, inputs, map_style, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.project_type)
        .bind(&project.relative_location)
        .bind(&project.site_bounds)
        .bind(&project.site_envelope)
        .bind(&project.blocks_envelope)
        .bind(&inputs)
        .bind(&project.map_style)
        .bind(project.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(project),
            Err(e) if is_unique_violation(&e) => Err(duplicate_name(&project.name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(&select_where("id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Project::try_from)
            .transpose()?
            .ok_or_else(|| project_not_found(id))
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Project::try_from).collect()
    }

    async fn save_inputs(&self, id: Uuid, patch: SaveInputs) -> Result<Project> {
        let inputs = patch.inputs.as_ref().map(serde_json::to_value).transpose()?;

        let sql = format!(
            r#"
            UPDATE projects SET
                inputs = COALESCE($2, inputs),
                site_bounds = COALESCE($3, site_bounds),
                site_envelope = COALESCE($4, site_envelope),
                blocks_envelope = COALESCE($5, blocks_envelope),
                map_style = COALESCE($6, map_style)
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .bind(inputs)
            .bind(patch.site_bounds)
            .bind(patch.site_envelope)
            .bind(patch.blocks_envelope)
            .bind(patch.map_style)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Project::try_from)
            .transpose()?
            .ok_or_else(|| project_not_found(id))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(project_not_found(id));
        }
        Ok(())
    }
}
