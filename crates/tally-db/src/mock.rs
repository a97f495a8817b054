//! In-memory store doubles for tests
//!
//! [`InMemoryStore`] implements every store trait over one shared state.
//! Its confirmation transaction stages writes and applies them only on
//! commit, holds a per-receipt lock like the Postgres row lock, and can be
//! told to fail the next item insert.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tally_core::models::{
    Group, NewGroup, NewPurchaseItem, OcrStatus, PurchaseItem, Receipt, SessionUser,
};
use tally_core::AppError;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::store::{GroupStore, HealthProbe, ReceiptStore, ReceiptTransaction, SessionStore};

#[derive(Default)]
struct State {
    users: HashMap<i64, SessionUser>,
    sessions: HashMap<String, (i64, DateTime<Utc>)>,
    groups: BTreeMap<i64, Group>,
    members: HashSet<(i64, i64)>,
    receipts: BTreeMap<i64, Receipt>,
    items: Vec<PurchaseItem>,
    row_locks: HashMap<i64, Arc<AsyncMutex<()>>>,
    next_id: i64,
    fail_next_item_insert: bool,
    fail_latest_key_lookup: bool,
    unavailable: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    pub fn add_user(&self, id: i64, display_name: &str) -> SessionUser {
        let user = SessionUser {
            id,
            display_name: display_name.to_string(),
            picture_url: None,
        };
        self.state().users.insert(id, user.clone());
        user
    }

    pub fn add_session(&self, token: &str, user_id: i64, last_used_at: DateTime<Utc>) {
        self.state()
            .sessions
            .insert(token.to_string(), (user_id, last_used_at));
    }

    pub fn session_last_used(&self, token: &str) -> Option<DateTime<Utc>> {
        self.state().sessions.get(token).map(|(_, at)| *at)
    }

    /// Insert a group with a fixed id, bypassing the owner flow.
    pub fn add_group(&self, id: i64, name: &str, created_by: i64) -> Group {
        let group = Group {
            id,
            name: name.to_string(),
            menu: "menu".to_string(),
            menu_image_url: String::new(),
            created_by,
            created_at: Utc::now(),
        };
        let mut state = self.state();
        state.groups.insert(id, group.clone());
        state.next_id = state.next_id.max(id);
        group
    }

    pub fn add_membership(&self, group_id: i64, user_id: i64) {
        self.state().members.insert((group_id, user_id));
    }

    pub fn receipt(&self, receipt_id: i64) -> Option<Receipt> {
        self.state().receipts.get(&receipt_id).cloned()
    }

    pub fn items_for(&self, receipt_id: i64) -> Vec<PurchaseItem> {
        self.state()
            .items
            .iter()
            .filter(|i| i.receipt_id == receipt_id)
            .cloned()
            .collect()
    }

    pub fn receipt_count(&self) -> usize {
        self.state().receipts.len()
    }

    pub fn fail_next_item_insert(&self) {
        self.state().fail_next_item_insert = true;
    }

    pub fn fail_latest_key_lookup(&self) {
        self.state().fail_latest_key_lookup = true;
    }

    /// Make every store call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.state().unavailable {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn touch_active_session(
        &self,
        token: &str,
        window: Duration,
    ) -> Result<Option<SessionUser>, AppError> {
        self.check_available()?;
        let mut state = self.state();
        let now = Utc::now();
        let user_id = match state.sessions.get_mut(token) {
            Some((user_id, last_used)) if *last_used > now - window => {
                *last_used = now;
                *user_id
            }
            _ => return Ok(None),
        };
        Ok(state.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn get(&self, group_id: i64) -> Result<Option<Group>, AppError> {
        self.check_available()?;
        Ok(self.state().groups.get(&group_id).cloned())
    }

    async fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.state().members.contains(&(group_id, user_id)))
    }

    async fn create_with_owner(&self, group: NewGroup, owner_id: i64) -> Result<Group, AppError> {
        self.check_available()?;
        let mut state = self.state();
        let id = state.next_id();
        let created = Group {
            id,
            name: group.name,
            menu: group.menu,
            menu_image_url: group.menu_image_url,
            created_by: owner_id,
            created_at: Utc::now(),
        };
        state.groups.insert(id, created.clone());
        state.members.insert((id, owner_id));
        Ok(created)
    }

    async fn add_member(&self, group_id: i64, user_id: i64, _is_owner: bool) -> Result<(), AppError> {
        self.check_available()?;
        if !self.state().members.insert((group_id, user_id)) {
            return Err(AppError::Conflict(
                "You are already a member of this group".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ReceiptStore for InMemoryStore {
    async fn create_pending(
        &self,
        group_id: i64,
        file_key: &str,
        uploaded_by: i64,
    ) -> Result<Receipt, AppError> {
        self.check_available()?;
        let mut state = self.state();
        if !state.groups.contains_key(&group_id) {
            return Err(AppError::NotFound("Group not found".to_string()));
        }
        let id = state.next_id();
        // Strictly increasing timestamps keep the latest-key lookup deterministic.
        let created_at = state
            .receipts
            .values()
            .map(|r| r.created_at)
            .max()
            .map(|latest| latest.max(Utc::now()) + Duration::microseconds(1))
            .unwrap_or_else(Utc::now);
        let receipt = Receipt {
            id,
            group_id,
            file_key: file_key.to_string(),
            ocr_status: OcrStatus::Pending,
            is_uploaded: false,
            uploaded_by,
            created_at,
            updated_at: created_at,
        };
        state.receipts.insert(id, receipt.clone());
        Ok(receipt)
    }

    async fn get(&self, receipt_id: i64) -> Result<Option<Receipt>, AppError> {
        self.check_available()?;
        Ok(self.state().receipts.get(&receipt_id).cloned())
    }

    async fn latest_object_key_for_group(
        &self,
        group_id: i64,
    ) -> Result<Option<String>, AppError> {
        self.check_available()?;
        let mut state = self.state();
        if std::mem::take(&mut state.fail_latest_key_lookup) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(state
            .receipts
            .values()
            .filter(|r| r.group_id == group_id)
            .max_by_key(|r| (r.created_at, r.id))
            .map(|r| r.file_key.clone()))
    }

    async fn list_items(&self, receipt_id: i64) -> Result<Vec<PurchaseItem>, AppError> {
        self.check_available()?;
        Ok(self.items_for(receipt_id))
    }

    async fn begin(&self) -> Result<Box<dyn ReceiptTransaction>, AppError> {
        self.check_available()?;
        Ok(Box::new(InMemoryReceiptTransaction {
            state: self.state.clone(),
            row_locks: Vec::new(),
            staged: Vec::new(),
        }))
    }
}

#[async_trait]
impl HealthProbe for InMemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

enum StagedWrite {
    Uploaded(i64),
    Items(i64, i64, Vec<NewPurchaseItem>),
    Status(i64, OcrStatus),
}

pub struct InMemoryReceiptTransaction {
    state: Arc<Mutex<State>>,
    row_locks: Vec<OwnedMutexGuard<()>>,
    staged: Vec<StagedWrite>,
}

impl InMemoryReceiptTransaction {
    fn staged_status(&self, receipt_id: i64) -> Option<OcrStatus> {
        self.staged.iter().rev().find_map(|w| match w {
            StagedWrite::Status(id, status) if *id == receipt_id => Some(*status),
            _ => None,
        })
    }
}

#[async_trait]
impl ReceiptTransaction for InMemoryReceiptTransaction {
    async fn mark_uploaded(&mut self, receipt_id: i64) -> Result<OcrStatus, AppError> {
        let row_lock = {
            let mut state = lock(&self.state);
            state.row_locks.entry(receipt_id).or_default().clone()
        };
        self.row_locks.push(row_lock.lock_owned().await);

        let committed = lock(&self.state)
            .receipts
            .get(&receipt_id)
            .map(|r| r.ocr_status)
            .ok_or_else(|| AppError::NotFound("Receipt not found".to_string()))?;

        self.staged.push(StagedWrite::Uploaded(receipt_id));
        Ok(self.staged_status(receipt_id).unwrap_or(committed))
    }

    async fn insert_purchase_items(
        &mut self,
        receipt_id: i64,
        group_id: i64,
        items: &[NewPurchaseItem],
    ) -> Result<u64, AppError> {
        if std::mem::take(&mut lock(&self.state).fail_next_item_insert) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "injected item insert failure".to_string(),
            )));
        }
        self.staged
            .push(StagedWrite::Items(receipt_id, group_id, items.to_vec()));
        Ok(items.len() as u64)
    }

    async fn set_ocr_status(&mut self, receipt_id: i64, status: OcrStatus) -> Result<(), AppError> {
        self.staged.push(StagedWrite::Status(receipt_id, status));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
        let mut state = lock(&self.state);
        let now = Utc::now();
        for write in self.staged.drain(..) {
            match write {
                StagedWrite::Uploaded(id) => {
                    if let Some(r) = state.receipts.get_mut(&id) {
                        r.is_uploaded = true;
                        r.updated_at = now;
                    }
                }
                StagedWrite::Status(id, status) => {
                    if let Some(r) = state.receipts.get_mut(&id) {
                        r.ocr_status = status;
                        r.updated_at = now;
                    }
                }
                StagedWrite::Items(receipt_id, group_id, items) => {
                    for item in items {
                        let id = state.next_id();
                        state.items.push(PurchaseItem {
                            id,
                            receipt_id,
                            group_id,
                            item_name: item.item_name,
                            predict_item_name: item.predict_item_name,
                            price: item.price,
                            quantity: item.quantity,
                            created_at: now,
                        });
                    }
                }
            }
        }
        drop(state);
        self.row_locks.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn coffee() -> NewPurchaseItem {
        NewPurchaseItem {
            item_name: "Coffee".to_string(),
            predict_item_name: String::new(),
            price: Decimal::new(350, 2),
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = InMemoryStore::new();
        store.add_group(42, "lunch", 7);
        let receipt = store.create_pending(42, "42/a.png", 7).await.unwrap();

        let mut tx = ReceiptStore::begin(&store).await.unwrap();
        tx.mark_uploaded(receipt.id).await.unwrap();
        tx.insert_purchase_items(receipt.id, 42, &[coffee()])
            .await
            .unwrap();
        assert!(!store.receipt(receipt.id).unwrap().is_uploaded);
        tx.rollback().await.unwrap();

        assert!(!store.receipt(receipt.id).unwrap().is_uploaded);
        assert!(store.items_for(receipt.id).is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let store = InMemoryStore::new();
        store.add_group(42, "lunch", 7);
        let receipt = store.create_pending(42, "42/a.png", 7).await.unwrap();

        let mut tx = ReceiptStore::begin(&store).await.unwrap();
        assert_eq!(tx.mark_uploaded(receipt.id).await.unwrap(), OcrStatus::Pending);
        tx.insert_purchase_items(receipt.id, 42, &[coffee()])
            .await
            .unwrap();
        tx.set_ocr_status(receipt.id, OcrStatus::Completed)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = store.receipt(receipt.id).unwrap();
        assert!(stored.is_uploaded);
        assert_eq!(stored.ocr_status, OcrStatus::Completed);
        assert_eq!(store.items_for(receipt.id).len(), 1);
    }

    #[tokio::test]
    async fn test_latest_key_is_most_recent_in_group() {
        let store = InMemoryStore::new();
        store.add_group(42, "lunch", 7);
        store.add_group(43, "dinner", 7);
        store.create_pending(42, "42/first.png", 7).await.unwrap();
        store.create_pending(43, "43/other.png", 7).await.unwrap();
        store.create_pending(42, "42/second.png", 7).await.unwrap();

        assert_eq!(
            store.latest_object_key_for_group(42).await.unwrap().as_deref(),
            Some("42/second.png")
        );
        assert!(store.latest_object_key_for_group(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_receipt_for_unknown_group_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.create_pending(5, "5/a.png", 7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.receipt_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_is_not_touched() {
        let store = InMemoryStore::new();
        store.add_user(7, "alice");
        let stale = Utc::now() - Duration::days(31);
        store.add_session("stale", 7, stale);

        let user = store
            .touch_active_session("stale", Duration::days(30))
            .await
            .unwrap();
        assert!(user.is_none());
        assert_eq!(store.session_last_used("stale"), Some(stale));
    }

    #[tokio::test]
    async fn test_duplicate_membership_conflicts() {
        let store = InMemoryStore::new();
        store.add_group(42, "lunch", 7);
        GroupStore::add_member(&store, 42, 9, false).await.unwrap();
        let err = GroupStore::add_member(&store, 42, 9, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
