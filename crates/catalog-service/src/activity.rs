//! Admin activity feed
//!
//! Mutations publish a typed [`ActivityEvent`] to an unbounded channel and
//! return without waiting; an [`ActivityWorker`] drains the channel and
//! appends one log document per event. A failed append is logged and never
//! reaches the mutation that caused it.

use awire_common::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::store::{Collection, DocumentStore};

/// The kind of record an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    CraftItem,
    Artisan,
    Photo,
}

impl Subject {
    fn label(&self) -> &'static str {
        match self {
            Subject::CraftItem => "Artesanato",
            Subject::Artisan => "Artesão",
            Subject::Photo => "Foto",
        }
    }
}

/// Something worth showing on the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    Created { subject: Subject, name: String },
    Updated { subject: Subject, name: String },
    Deleted { subject: Subject, name: String },
    /// An artisan rename was copied onto their craft items
    ArtisanNameSynced { name: String, items: usize },
}

impl ActivityEvent {
    pub fn action(&self) -> String {
        match self {
            ActivityEvent::Created { subject, .. } => format!("{} adicionado", subject.label()),
            ActivityEvent::Updated { subject, .. } => format!("{} atualizado", subject.label()),
            ActivityEvent::Deleted { subject, .. } => format!("{} excluído", subject.label()),
            ActivityEvent::ArtisanNameSynced { .. } => "Produtos sincronizados".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            ActivityEvent::Created { subject: Subject::Photo, name } => {
                format!("Nova foto adicionada à galeria: {}", name)
            }
            ActivityEvent::Created { name, .. } => format!("{} foi adicionado", name),
            ActivityEvent::Updated { name, .. } => format!("{} foi editado", name),
            ActivityEvent::Deleted { name, .. } => format!("{} foi excluído", name),
            ActivityEvent::ArtisanNameSynced { name, items } => format!(
                "Nome do artesão {} atualizado em {} produto(s)",
                name, items
            ),
        }
    }

    fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("acao".to_string(), json!(self.action()));
        fields.insert("descricao".to_string(), json!(self.description()));
        fields
    }
}

/// Sending half, cloned into every data-layer handle
#[derive(Debug, Clone)]
pub struct ActivityOutbox {
    tx: mpsc::UnboundedSender<ActivityEvent>,
}

impl ActivityOutbox {
    /// Create an outbox and the worker that persists its events
    pub fn channel(store: Arc<dyn DocumentStore>) -> (Self, ActivityWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ActivityWorker { rx, store })
    }

    /// Queue an event; never fails the caller
    pub fn record(&self, event: ActivityEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Activity worker stopped, dropping event: {:?}", e.0);
        }
    }
}

/// Receiving half; run it on its own task
pub struct ActivityWorker {
    rx: mpsc::UnboundedReceiver<ActivityEvent>,
    store: Arc<dyn DocumentStore>,
}

impl ActivityWorker {
    /// Persist events until every outbox handle has been dropped
    pub async fn run(mut self) {
        debug!("Activity worker started");

        while let Some(event) = self.rx.recv().await {
            if let Err(e) = self.append(event).await {
                error!("Failed to write activity log entry: {}", e);
            }
        }

        debug!("Activity worker stopped");
    }

    async fn append(&self, event: ActivityEvent) -> Result<()> {
        debug!("Recording activity: {:?}", event);
        self.store
            .add(Collection::ActivityLog, event.into_fields())
            .await?;
        Ok(())
    }
}
