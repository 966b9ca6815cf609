pub mod error;
pub mod migrations;
pub mod models;
pub mod notes;
pub mod queries;
pub mod users;

pub use error::StoreError;
pub use notes::{NoteStore, SqliteNoteStore};
pub use users::{SqliteUserStore, UserStore};

use rusqlite::{Connection, InterruptHandle};
use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single SQLite connection shared by every request of one service.
///
/// All access goes through `with_conn` from inside `spawn_blocking`; the
/// connection is never touched on an async worker thread. Calls made through
/// [`blocking`] are cancellable: a call abandoned before it reaches the
/// connection never runs, and one abandoned mid-statement is interrupted.
pub struct Database {
    conn: Mutex<Option<Connection>>,
    interrupt: InterruptHandle,
    /// Call currently holding the connection, if it came through `blocking`.
    active: Mutex<Option<u64>>,
    next_call: AtomicU64,
}

#[derive(Clone)]
struct Ticket {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

thread_local! {
    static CURRENT: RefCell<Option<Ticket>> = const { RefCell::new(None) };
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        info!("Database opened at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            interrupt: conn.get_interrupt_handle(),
            conn: Mutex::new(Some(conn)),
            active: Mutex::new(None),
            next_call: AtomicU64::new(1),
        }
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::Task(format!("DB lock poisoned: {}", e)))?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let ticket = CURRENT.with(|current| current.borrow().clone());
        if let Some(ticket) = &ticket {
            // Checked under the same lock `cancel` takes, so a cancelled call
            // either never starts or is seen as active and interrupted.
            let mut active = self.lock_active()?;
            if ticket.cancelled.load(Ordering::Acquire) {
                return Err(StoreError::Cancelled);
            }
            *active = Some(ticket.id);
        }

        let result = f(conn);

        if ticket.is_some() {
            *self.lock_active()? = None;
        }
        result
    }

    /// Close the connection. Every later call fails with `StoreError::Closed`.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::Task(format!("DB lock poisoned: {}", e)))?;
        match guard.take() {
            Some(conn) => conn.close().map_err(|(_, e)| StoreError::from(e)),
            None => Ok(()),
        }
    }

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<u64>>, StoreError> {
        self.active
            .lock()
            .map_err(|e| StoreError::Task(format!("call lock poisoned: {}", e)))
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            id: self.next_call.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn cancel(&self, ticket: &Ticket) {
        let Ok(active) = self.active.lock() else {
            return;
        };
        ticket.cancelled.store(true, Ordering::Release);
        if *active == Some(ticket.id) {
            warn!(call = ticket.id, "interrupting abandoned store call");
            self.interrupt.interrupt();
        }
    }
}

/// Cancels its call when dropped before `finish`, which is what happens when
/// the awaiting future is dropped at a deadline.
struct PendingCall {
    db: Arc<Database>,
    ticket: Ticket,
    finished: bool,
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if !self.finished {
            self.db.cancel(&self.ticket);
        }
    }
}

/// Clears the worker thread's ticket even if the closure panics.
struct CurrentTicket;

impl CurrentTicket {
    fn set(ticket: Ticket) -> Self {
        CURRENT.with(|current| *current.borrow_mut() = Some(ticket));
        Self
    }
}

impl Drop for CurrentTicket {
    fn drop(&mut self) {
        CURRENT.with(|current| *current.borrow_mut() = None);
    }
}

/// Run a blocking database closure on the blocking thread pool. Dropping the
/// returned future cancels the work rather than leaving it to finish unseen.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let mut call = PendingCall {
        db: Arc::clone(db),
        ticket: db.ticket(),
        finished: false,
    };
    let ticket = call.ticket.clone();
    let worker = Arc::clone(db);

    let joined = tokio::task::spawn_blocking(move || {
        let _current = CurrentTicket::set(ticket);
        f(&worker)
    })
    .await;
    call.finished = true;

    joined.map_err(|e| StoreError::Task(e.to_string()))?
}
