//! Scripted in-memory data source shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{CashflowEntry, CashflowType, Period, Position, RecordId},
    protocol::{Cursor, Page},
};
use tokio::sync::{Mutex, Notify};

use crate::{data_source::DataSource, error::TransportError, resources::Resource};

type CursorKey = Option<String>;

pub(crate) struct ScriptedSource<R: Resource> {
    pages: Mutex<HashMap<CursorKey, VecDeque<Result<Page<R::Record>, TransportError>>>>,
    gates: Mutex<HashMap<CursorKey, Arc<Notify>>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
    write_failure: Mutex<Option<TransportError>>,
    pub(crate) list_calls: Mutex<Vec<CursorKey>>,
    pub(crate) creates: Mutex<Vec<R::Payload>>,
    pub(crate) updates: Mutex<Vec<(RecordId, R::Payload)>>,
    pub(crate) removes: Mutex<Vec<RecordId>>,
    pub(crate) activates: Mutex<Vec<RecordId>>,
    created: Mutex<Option<R::Record>>,
}

impl<R: Resource> ScriptedSource<R> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            write_gate: Mutex::new(None),
            write_failure: Mutex::new(None),
            list_calls: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            removes: Mutex::new(Vec::new()),
            activates: Mutex::new(Vec::new()),
            created: Mutex::new(None),
        })
    }

    /// Queues a response for `cursor`. The last queued response for a cursor
    /// is repeated once the queue would otherwise run dry.
    pub(crate) async fn push_page(&self, cursor: Option<&str>, page: Page<R::Record>) {
        self.push(cursor, Ok(page)).await;
    }

    pub(crate) async fn push_failure(&self, cursor: Option<&str>, message: &str) {
        self.push(cursor, Err(TransportError::network(message))).await;
    }

    async fn push(&self, cursor: Option<&str>, response: Result<Page<R::Record>, TransportError>) {
        self.pages
            .lock()
            .await
            .entry(cursor.map(str::to_string))
            .or_default()
            .push_back(response);
    }

    /// Holds every `list` call for `cursor` until the returned gate is notified.
    pub(crate) async fn gate(&self, cursor: Option<&str>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .await
            .insert(cursor.map(str::to_string), gate.clone());
        gate
    }

    pub(crate) async fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().await = Some(gate.clone());
        gate
    }

    pub(crate) async fn fail_writes(&self, message: &str) {
        *self.write_failure.lock().await = Some(TransportError::network(message));
    }

    pub(crate) async fn succeed_writes(&self) {
        *self.write_failure.lock().await = None;
    }

    pub(crate) async fn return_on_write(&self, record: R::Record) {
        *self.created.lock().await = Some(record);
    }

    pub(crate) async fn list_call_count(&self) -> usize {
        self.list_calls.lock().await.len()
    }

    pub(crate) async fn first_page_calls(&self) -> usize {
        self.list_calls
            .lock()
            .await
            .iter()
            .filter(|cursor| cursor.is_none())
            .count()
    }

    pub(crate) async fn write_count(&self) -> usize {
        self.creates.lock().await.len()
            + self.updates.lock().await.len()
            + self.removes.lock().await.len()
            + self.activates.lock().await.len()
    }

    /// Waits until `list` has been entered `count` times.
    pub(crate) async fn wait_for_list_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.list_call_count().await < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("list call never happened");
    }

    async fn write_result(&self) -> Result<(), TransportError> {
        let gate = self.write_gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.write_failure.lock().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R: Resource> DataSource<R> for ScriptedSource<R> {
    async fn list(&self, cursor: Option<&Cursor>) -> Result<Page<R::Record>, TransportError> {
        let key = cursor.map(|cursor| cursor.as_str().to_string());
        self.list_calls.lock().await.push(key.clone());

        let gate = self.gates.lock().await.get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut pages = self.pages.lock().await;
        let Some(queue) = pages.get_mut(&key) else {
            return Err(TransportError::network(format!("no page scripted for {key:?}")));
        };
        match queue.len() {
            0 => Err(TransportError::network("script exhausted")),
            1 => queue.front().cloned().expect("one response"),
            _ => queue.pop_front().expect("queued response"),
        }
    }

    async fn create(&self, payload: &R::Payload) -> Result<R::Record, TransportError> {
        self.creates.lock().await.push(payload.clone());
        self.write_result().await?;
        self.created
            .lock()
            .await
            .clone()
            .ok_or_else(|| TransportError::network("no record scripted for writes"))
    }

    async fn update(
        &self,
        id: RecordId,
        payload: &R::Payload,
    ) -> Result<R::Record, TransportError> {
        self.updates.lock().await.push((id, payload.clone()));
        self.write_result().await?;
        self.created
            .lock()
            .await
            .clone()
            .ok_or_else(|| TransportError::network("no record scripted for writes"))
    }

    async fn remove(&self, id: RecordId) -> Result<(), TransportError> {
        self.removes.lock().await.push(id);
        self.write_result().await
    }

    async fn activate(&self, id: RecordId) -> Result<R::Record, TransportError> {
        self.activates.lock().await.push(id);
        self.write_result().await?;
        self.created
            .lock()
            .await
            .clone()
            .ok_or_else(|| TransportError::network("no record scripted for writes"))
    }
}

pub(crate) fn cashflow(id: i64, kind: CashflowType) -> CashflowEntry {
    CashflowEntry {
        id: RecordId(id),
        date: "2022-01-02".parse().expect("date"),
        idr_amount: "10000.00".to_string(),
        note: format!("entry {id}"),
        kind,
    }
}

pub(crate) fn position(id: i64, name: &str, level: i32) -> Position {
    Position {
        id: RecordId(id),
        name: name.to_string(),
        level,
    }
}

pub(crate) fn period(id: i64, is_active: bool) -> Period {
    Period {
        id: RecordId(id),
        start_date: "2022-01-01".parse().ok(),
        end_date: "2022-12-31".parse().ok(),
        is_active,
        goals: None,
        structure: Vec::new(),
    }
}

pub(crate) fn page<T>(items: Vec<T>, cursor: Option<&str>) -> Page<T> {
    Page::new(items, cursor.map(Cursor::new))
}

pub(crate) fn ids<T: shared::domain::Record>(items: &[T]) -> Vec<i64> {
    items.iter().map(|item| item.id().0).collect()
}
