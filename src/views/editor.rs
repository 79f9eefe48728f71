use tracing::debug;

use crate::error::AppError;
use crate::gateway::Table;
use crate::resource::{Resource, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Update(i64),
}

/// Create/update form for one entity.
#[derive(Debug, Clone)]
pub struct Editor<R: Resource> {
    mode: EditorMode,
    draft: R::Draft,
}

impl<R: Resource> Default for Editor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Editor<R> {
    pub fn new() -> Self {
        Self { mode: EditorMode::Create, draft: R::Draft::default() }
    }

    /// Loads `row` into the form; submit then updates that row.
    pub fn begin_edit(&mut self, row: &R) {
        self.mode = EditorMode::Update(row.id());
        self.draft = row.draft();
    }

    /// Empty create form again. The stored row is not touched.
    pub fn cancel(&mut self) {
        *self = Self::new();
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn draft(&self) -> &R::Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut R::Draft {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: R::Draft) {
        self.draft = draft;
    }

    pub fn is_empty(&self) -> bool {
        self.mode == EditorMode::Create && self.draft == R::Draft::default()
    }

    /// Validates and writes the form. On success the form is cleared; on
    /// any failure the input is kept as entered.
    pub async fn submit(&mut self, table: &dyn Table<R>) -> Result<R, AppError> {
        self.draft.validate()?;

        let saved = match self.mode {
            EditorMode::Create => table.insert(&self.draft).await?,
            EditorMode::Update(id) => table
                .update(id, &self.draft)
                .await?
                .ok_or_else(|| AppError::not_found(format!("{} not found", R::LABEL)))?,
        };

        debug!(entity = R::LABEL, id = saved.id(), "Saved");
        self.cancel();
        Ok(saved)
    }
}
