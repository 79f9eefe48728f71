use tracing::{debug, warn};

use super::confirm::Confirm;
use crate::error::AppError;
use crate::gateway::{GatewayResult, Table};
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Identifies one load; only the most recent ticket may replace the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Deletes `id` only after `confirm` agrees.
pub async fn delete_row<R: Resource>(
    table: &dyn Table<R>,
    id: i64,
    confirm: &dyn Confirm,
) -> Result<DeleteOutcome, AppError> {
    let prompt = format!("Delete this {}?", R::LABEL.to_lowercase());
    if !confirm.confirm(&prompt) {
        debug!(entity = R::LABEL, id, "Delete declined");
        return Ok(DeleteOutcome::Declined);
    }

    if !table.delete(id).await? {
        return Err(AppError::not_found(format!("{} not found", R::LABEL)));
    }
    Ok(DeleteOutcome::Deleted)
}

/// The loaded rows of one entity plus the last load error.
#[derive(Debug, Clone)]
pub struct ListView<R: Resource> {
    rows: Vec<R>,
    error: Option<String>,
    generation: u64,
}

impl<R: Resource> Default for ListView<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ListView<R> {
    pub fn new() -> Self {
        Self { rows: Vec::new(), error: None, generation: 0 }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Applies a load result unless a newer load has started since `ticket`
    /// was issued. Failures keep the previous rows. Returns whether the
    /// result was applied.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: GatewayResult<Vec<R>>) -> bool {
        if ticket.0 != self.generation {
            debug!(entity = R::LABEL, stale = ticket.0, current = self.generation, "Dropping stale load");
            return false;
        }
        match result {
            Ok(rows) => {
                self.rows = rows;
                self.error = None;
            }
            Err(e) => {
                warn!(entity = R::LABEL, error = %e, "Load failed");
                self.error = Some(e.to_string());
            }
        }
        true
    }

    pub async fn load(&mut self, table: &dyn Table<R>) -> Result<&[R], AppError> {
        let ticket = self.begin_load();
        let result = table.list().await;
        let failure = result.as_ref().err().cloned();
        self.finish_load(ticket, result);
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(&self.rows),
        }
    }

    pub fn filtered(&self, filter: &R::Filter) -> Vec<&R> {
        self.rows.iter().filter(|row| row.matches(filter)).collect()
    }

    /// Confirmed delete followed by a reload. Declining changes nothing.
    pub async fn delete(
        &mut self,
        table: &dyn Table<R>,
        id: i64,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, AppError> {
        let outcome = delete_row(table, id, confirm).await?;
        if outcome == DeleteOutcome::Deleted {
            self.load(table).await?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::customer::{CustomerDraft, CustomerFilter};
    use crate::gateway::{Gateway, GatewayError, MemoryGateway};
    use crate::models::customer::Customer;

    async fn seeded() -> MemoryGateway {
        let gw = MemoryGateway::new();
        for (name, city) in [("Ana Pérez", "Rosario"), ("Bruno Díaz", "Córdoba"), ("Ana Gómez", "Córdoba")] {
            gw.customers()
                .insert(&CustomerDraft {
                    name: name.to_string(),
                    city: Some(city.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        gw
    }

    #[tokio::test]
    async fn filtered_rows_are_a_subset_matching_every_predicate() {
        let gw = seeded().await;
        let mut view = ListView::<Customer>::new();
        view.load(gw.customers()).await.unwrap();

        let filter = CustomerFilter {
            name: Some("ana".into()),
            city: Some("CÓRDOBA".into()),
            ..Default::default()
        };
        let filtered = view.filtered(&filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Ana Gómez");
        assert!(filtered.iter().all(|row| view.rows().contains(*row)));

        assert_eq!(view.filtered(&CustomerFilter::default()).len(), 3);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_rows() {
        let gw = seeded().await;
        let mut view = ListView::<Customer>::new();
        view.load(gw.customers()).await.unwrap();

        gw.set_offline(true);
        assert!(view.load(gw.customers()).await.is_err());
        assert_eq!(view.rows().len(), 3);
        assert_eq!(view.error(), Some("Gateway unreachable"));
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_newer_one() {
        let gw = seeded().await;
        let mut view = ListView::<Customer>::new();

        let slow = view.begin_load();
        let fast = view.begin_load();
        let fresh = gw.customers().list().await.unwrap();
        assert!(view.finish_load(fast, Ok(fresh)));
        assert!(!view.finish_load(slow, Err(GatewayError::Unavailable("timeout".into()))));
        assert!(!view.finish_load(slow, Ok(Vec::new())));

        assert_eq!(view.rows().len(), 3);
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn declined_delete_leaves_list_unchanged() {
        let gw = seeded().await;
        let mut view = ListView::<Customer>::new();
        view.load(gw.customers()).await.unwrap();
        let id = view.rows()[0].id;
        let before = gw.operations();

        let outcome = view.delete(gw.customers(), id, &false).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(view.rows().len(), 3);
        assert_eq!(gw.operations(), before);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_row_and_reloads() {
        let gw = seeded().await;
        let mut view = ListView::<Customer>::new();
        view.load(gw.customers()).await.unwrap();
        let id = view.rows()[0].id;

        let asked = |prompt: &str| prompt == "Delete this customer?";
        let outcome = view.delete(gw.customers(), id, &asked).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(view.rows().len(), 2);
        assert!(view.rows().iter().all(|c| c.id != id));
    }

    #[tokio::test]
    async fn deleting_missing_row_is_not_found() {
        let gw = MemoryGateway::new();
        let err = delete_row::<Customer>(gw.customers(), 99, &true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
