mod catalog;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use catalog::RoomCatalog;
pub use error::EngineError;
pub use store::{ReservationStore, SharedDayBook};

use std::io;
use std::path::PathBuf;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, mpsc, oneshot};
use tracing::info;
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group
/// commit: buffer the first append, drain everything already queued,
/// then one fsync for the whole batch before acking every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Commit the batch before any maintenance command.
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty
                    }
                }
                flush_and_respond(&mut wal, batch);
                if let Some(cmd) = deferred {
                    handle_maintenance(&mut wal, cmd);
                }
            }
            other => handle_maintenance(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, mut batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = std::time::Instant::now();
    let result = flush_batch(wal, &batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even after an append error, so partially buffered
    // bytes don't leak into the next batch (this batch's callers were
    // told it failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_maintenance(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── The reservation service ──────────────────────────────

/// Room catalog + reservation store + WAL, with the no-overlap
/// invariant enforced on every mutation. The store and catalog are
/// owned by the engine value; nothing here is process-global.
pub struct Engine {
    pub(super) catalog: RoomCatalog,
    pub(super) store: ReservationStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
}

impl Engine {
    /// Open (or create) the WAL at `wal_path`, replay it into a fresh
    /// catalog and store, and start the group-commit writer.
    pub fn open(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            catalog: RoomCatalog::new(),
            store: ReservationStore::new(),
            wal_tx,
        };

        // Replay is single-owner: every page lock is uncontended, so
        // try_write always succeeds instantly. Never use blocking
        // acquisition here — open may run inside an async context.
        for event in &events {
            match event {
                Event::RoomAdded { id, name } => {
                    engine.catalog.claim_name(name, *id);
                    engine.catalog.insert(Room {
                        id: *id,
                        name: name.clone(),
                    });
                }
                Event::ReservationBooked { id, room_id, day, slot } => {
                    let key = DayKey {
                        room_id: *room_id,
                        day: *day,
                    };
                    let page = engine.store.page_or_default(key);
                    let mut book = page.try_write().expect("replay: uncontended write");
                    book.insert(Reservation {
                        id: *id,
                        room_id: *room_id,
                        day: *day,
                        slot: *slot,
                    });
                    engine.store.map(*id, key);
                }
                Event::ReservationMoved { id, day, slot } => {
                    let Some(old_key) = engine.store.key_of(id) else {
                        continue; // cancelled later in a compacted log; nothing to move
                    };
                    let moved = engine.store.page(&old_key).and_then(|page| {
                        page.try_write().expect("replay: uncontended write").remove(*id)
                    });
                    if let Some(mut row) = moved {
                        row.day = *day;
                        row.slot = *slot;
                        let new_key = DayKey {
                            room_id: old_key.room_id,
                            day: *day,
                        };
                        let page = engine.store.page_or_default(new_key);
                        page.try_write().expect("replay: uncontended write").insert(row);
                        engine.store.map(*id, new_key);
                    }
                }
                Event::ReservationCancelled { id } => {
                    if let Some(key) = engine.store.key_of(id)
                        && let Some(page) = engine.store.page(&key)
                    {
                        page.try_write().expect("replay: uncontended write").remove(*id);
                    }
                    engine.store.unmap(id);
                }
            }
        }

        if !events.is_empty() {
            info!(
                events = events.len(),
                rooms = engine.catalog.len(),
                reservations = engine.store.reservation_count(),
                "WAL replayed"
            );
        }

        Ok(engine)
    }

    /// Hand an event to the group-commit writer and wait for the fsync
    /// ack. Nothing is applied in memory until this returns Ok.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// Resolve a reservation to its page and take the page write lock.
    ///
    /// The id → page index can go stale between lookup and lock
    /// acquisition (a concurrent update moved the row to another day),
    /// so re-check under the lock and resolve again on a miss. Under
    /// the returned guard, the index entry and the page row agree.
    pub(super) async fn resolve_write(
        &self,
        id: &Ulid,
    ) -> Result<(DayKey, OwnedRwLockWriteGuard<DayBook>), EngineError> {
        loop {
            let key = self
                .store
                .key_of(id)
                .ok_or(EngineError::ReservationNotFound(*id))?;
            let page = self
                .store
                .page(&key)
                .ok_or(EngineError::ReservationNotFound(*id))?;
            let guard = page.write_owned().await;
            if self.store.key_of(id) == Some(key) {
                return Ok((key, guard));
            }
        }
    }

    /// Read-lock flavour of [`Engine::resolve_write`].
    pub(super) async fn resolve_read(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockReadGuard<DayBook>, EngineError> {
        loop {
            let key = self
                .store
                .key_of(id)
                .ok_or(EngineError::ReservationNotFound(*id))?;
            let page = self
                .store
                .page(&key)
                .ok_or(EngineError::ReservationNotFound(*id))?;
            let guard = page.read_owned().await;
            if self.store.key_of(id) == Some(key) {
                return Ok(guard);
            }
        }
    }

    /// Rewrite the WAL with the minimal event set that recreates the
    /// current state. Maintenance operation; run it quiesced.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events: Vec<Event> = self
            .catalog
            .list()
            .into_iter()
            .map(|room| Event::RoomAdded {
                id: room.id,
                name: room.name,
            })
            .collect();
        for page in self.store.pages() {
            let book = page.read().await;
            for r in &book.reservations {
                events.push(Event::ReservationBooked {
                    id: r.id,
                    room_id: r.room_id,
                    day: r.day,
                    slot: r.slot,
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
