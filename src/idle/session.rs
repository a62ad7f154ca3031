//! Idle sources backed by a connection that can go away.
//!
//! The connection is opened on first use. A failed query drops it, so the
//! next sample reconnects instead of failing against a dead handle forever.

use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use super::SampleError;

/// Lazily opened, self-healing connection to an idle source.
pub struct LazySession<C, F> {
    connect: F,
    session: Mutex<Option<C>>,
}

impl<C, F> LazySession<C, F>
where
    F: Fn() -> Result<C, SampleError>,
{
    /// Create an unconnected session; `connect` runs on first use.
    pub fn new(connect: F) -> Self {
        Self {
            connect,
            session: Mutex::new(None),
        }
    }

    /// Run `query` against the connection, opening it first if needed.
    ///
    /// A connect failure is returned as-is. A query failure is returned and
    /// the connection is discarded.
    pub fn query<T>(
        &self,
        query: impl FnOnce(&C) -> Result<T, SampleError>,
    ) -> Result<T, SampleError> {
        let mut slot = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = match slot.take() {
            Some(conn) => conn,
            None => {
                let conn = (self.connect)()?;
                debug!("Idle source connected");
                conn
            }
        };

        let result = query(&conn);
        match &result {
            Ok(_) => *slot = Some(conn),
            Err(e) => warn!("Dropping idle source connection after error: {}", e),
        }
        result
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
