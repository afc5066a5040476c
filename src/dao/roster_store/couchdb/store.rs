use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, from_value};
use tokio::{sync::watch, time::sleep};
use tracing::{debug, info, warn};

use crate::dao::{
    models::{PlayerEntity, PlayerRecord},
    roster_store::{BackendKind, RosterStore, RosterSubscription},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocResult, BulkDocs, ChangesResponse, DESIGN_PREFIX, DatabaseInfo,
        RosterDocument, Tombstone, WriteResponse, rejected_writes, seq_param,
    },
};

const ALL_DOCS: &str = "_all_docs";
const BULK_DOCS: &str = "_bulk_docs";
const CHANGES: &str = "_changes";
/// How long CouchDB holds a long-poll request open before answering with no changes.
const LONGPOLL_TIMEOUT_MS: u64 = 25_000;
const FEED_RETRY_INITIAL: Duration = Duration::from_millis(500);
const FEED_RETRY_MAX: Duration = Duration::from_secs(10);

/// Roster backed by a CouchDB database.
///
/// Each joined alias is one document `{nickname, timestamp}` whose `_id` is
/// assigned by CouchDB. Cloning shares the HTTP client.
#[derive(Clone)]
pub struct CouchRosterStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchRosterStore {
    /// Reach the server and create the roster database when missing.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::Client { source })?;

        let store = Self {
            client,
            config: Arc::new(config),
        };
        store.ensure_database().await?;
        info!(database = %store.config.database, "CouchDB roster database ready");
        Ok(store)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.with_auth(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.with_auth(self.client.post(self.url(path)))
    }

    /// URL of `path` inside the database; an empty path is the database itself.
    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.config.database_url()
        } else {
            format!("{}/{}", self.config.database_url(), path)
        }
    }

    /// Send `request`, turning transport failures and non-success statuses into errors.
    async fn execute(&self, request: RequestBuilder, path: &str) -> CouchResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(CouchDaoError::Status {
                path: path.to_string(),
                status,
            })
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> CouchResult<T> {
        self.execute(request, path)
            .await?
            .json::<T>()
            .await
            .map_err(|source| CouchDaoError::Decode {
                path: path.to_string(),
                source,
            })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.config.database.as_str();
        match self.execute(self.get(""), database).await {
            Ok(_) => Ok(()),
            Err(CouchDaoError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => {
                let create = self.with_auth(self.client.put(self.url("")));
                self.execute(create, database).await?;
                info!(database, "created CouchDB roster database");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn update_seq(&self) -> CouchResult<Value> {
        let info: DatabaseInfo = self
            .fetch_json(self.get(""), &self.config.database)
            .await?;
        Ok(info.update_seq)
    }

    async fn all_docs(&self, include_docs: bool) -> CouchResult<AllDocsResponse> {
        let request = self.get(ALL_DOCS).query(&[("include_docs", include_docs)]);
        self.fetch_json(request, ALL_DOCS).await
    }

    /// Fetch the whole roster collection. Documents that do not look like roster
    /// records are skipped.
    async fn fetch_roster(&self) -> CouchResult<Vec<PlayerEntity>> {
        let payload = self.all_docs(true).await?;

        let mut roster = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            if row.id.starts_with(DESIGN_PREFIX) {
                continue;
            }
            let Some(doc) = row.doc else { continue };
            match from_value::<RosterDocument>(doc) {
                Ok(doc) => roster.push(doc.into()),
                Err(err) => warn!(doc_id = %row.id, error = %err, "skipping malformed roster document"),
            }
        }

        Ok(roster)
    }

    async fn changes_since(&self, since: &Value) -> CouchResult<ChangesResponse> {
        let request = self.get(CHANGES).query(&[
            ("feed", "longpoll".to_string()),
            ("since", seq_param(since)),
            ("timeout", LONGPOLL_TIMEOUT_MS.to_string()),
        ]);
        self.fetch_json(request, CHANGES).await
    }

    async fn post_record(&self, record: &PlayerRecord) -> CouchResult<String> {
        let written: WriteResponse = self
            .fetch_json(self.post("").json(record), &self.config.database)
            .await?;
        written.id.ok_or(CouchDaoError::MissingId)
    }

    /// Delete every roster document in one `_bulk_docs` request.
    async fn delete_all(&self) -> CouchResult<()> {
        let docs: Vec<Tombstone> = self
            .all_docs(false)
            .await?
            .rows
            .into_iter()
            .filter(|row| !row.id.starts_with(DESIGN_PREFIX))
            .filter_map(|row| {
                row.value.map(|value| Tombstone {
                    id: row.id,
                    rev: value.rev,
                    deleted: true,
                })
            })
            .collect();

        if docs.is_empty() {
            return Ok(());
        }

        let count = docs.len();
        let results: Vec<BulkDocResult> = self
            .fetch_json(self.post(BULK_DOCS).json(&BulkDocs { docs }), BULK_DOCS)
            .await?;
        // `_bulk_docs` answers 201 even when individual deletions fail.
        let rejected = rejected_writes(&results);
        if let Some(first) = rejected.first() {
            warn!(rejected = rejected.len(), doc_id = %first.id, "roster documents survived clear");
            return Err(CouchDaoError::BulkRejected {
                rejected: rejected.len(),
                first_id: first.id.clone(),
                reason: first.describe(),
            });
        }
        debug!(count, "deleted roster documents");
        Ok(())
    }

    /// Sequence first, then documents: a change landing in between is replayed by the feed.
    async fn snapshot(&self) -> CouchResult<(Value, Vec<PlayerEntity>)> {
        let seq = self.update_seq().await?;
        let roster = self.fetch_roster().await?;
        Ok((seq, roster))
    }

    /// Follow the changes feed from `since`, republishing the full collection
    /// after each change until every receiver is gone.
    async fn run_feed(self, updates: watch::Sender<Vec<PlayerEntity>>, since: Value) {
        let mut delay = FEED_RETRY_INITIAL;
        let mut since = Some(since);

        while !updates.is_closed() {
            let seq = match since.take() {
                Some(seq) => seq,
                None => match self.snapshot().await {
                    Ok((seq, roster)) => {
                        updates.send_replace(roster);
                        seq
                    }
                    Err(err) => {
                        warn!(error = %err, "roster resync failed; retrying");
                        sleep(delay).await;
                        delay = (delay * 2).min(FEED_RETRY_MAX);
                        continue;
                    }
                },
            };

            match self.changes_since(&seq).await {
                Ok(changes) if changes.results.is_empty() => {
                    delay = FEED_RETRY_INITIAL;
                    since = Some(changes.last_seq);
                }
                Ok(changes) => {
                    delay = FEED_RETRY_INITIAL;
                    debug!(count = changes.results.len(), "roster changed");
                    match self.fetch_roster().await {
                        Ok(roster) => {
                            updates.send_replace(roster);
                            since = Some(changes.last_seq);
                        }
                        // `since` stays empty so the next pass resyncs from scratch.
                        Err(err) => warn!(error = %err, "failed to refetch roster after change"),
                    }
                }
                Err(err) => {
                    warn!(error = %err, "roster changes feed failed; resubscribing");
                    sleep(delay).await;
                    delay = (delay * 2).min(FEED_RETRY_MAX);
                }
            }
        }

        debug!("roster changes feed stopped");
    }
}

impl RosterStore for CouchRosterStore {
    fn kind(&self) -> BackendKind {
        BackendKind::CouchDb
    }

    fn subscribe(&self) -> BoxFuture<'static, StorageResult<RosterSubscription>> {
        let store = self.clone();
        Box::pin(async move {
            let (seq, roster) = store.snapshot().await?;
            let (updates, receiver) = watch::channel(roster);
            let feed = tokio::spawn(store.run_feed(updates, seq));
            Ok(RosterSubscription::with_feed(receiver, feed))
        })
    }

    fn append(&self, record: PlayerRecord) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            let id = store.post_record(&record).await?;
            Ok(Some(id))
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_all().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
