//! Idle sampling for Linux using the X11 XScreenSaver extension.

use std::time::Duration;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::screensaver::ConnectionExt as ScreensaverConnectionExt;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use super::session::LazySession;
use super::{IdleSampler, SampleError};

/// Open display connection plus the root window to query.
struct X11Session {
    conn: RustConnection,
    root: Window,
}

type Connect = fn() -> Result<X11Session, SampleError>;

/// Idle sampler backed by `XScreenSaverQueryInfo`.
///
/// The display connection is reopened after any failure, so an X server
/// restart (log out, display manager restart) only costs one tick.
pub struct PlatformSampler {
    session: LazySession<X11Session, Connect>,
}

impl PlatformSampler {
    /// Create the sampler. A missing display is not fatal; it is retried on
    /// every sample.
    pub fn new() -> Result<Self, SampleError> {
        let sampler = Self {
            session: LazySession::new(connect as Connect),
        };

        match sampler.sample() {
            Ok(_) => info!("Using X11 XScreenSaver for idle sampling"),
            Err(e) => warn!("X11 idle source not available yet, will retry: {}", e),
        }
        Ok(sampler)
    }
}

impl IdleSampler for PlatformSampler {
    fn sample(&self) -> Result<Duration, SampleError> {
        self.session.query(query)
    }
}

fn connect() -> Result<X11Session, SampleError> {
    let (conn, screen_num) = RustConnection::connect(None).map_err(|e| {
        SampleError::Unavailable(format!(
            "failed to connect to X11 display (is DISPLAY set?): {e}"
        ))
    })?;

    let root = conn
        .setup()
        .roots
        .get(screen_num)
        .map(|screen| screen.root)
        .ok_or_else(|| SampleError::Unavailable(format!("X11 screen {screen_num} not found")))?;

    Ok(X11Session { conn, root })
}

fn query(session: &X11Session) -> Result<Duration, SampleError> {
    let reply = session
        .conn
        .screensaver_query_info(session.root)
        .map_err(|e| SampleError::Query(e.to_string()))?
        .reply()
        .map_err(|e| SampleError::Query(e.to_string()))?;

    debug!("XScreenSaver ms_since_user_input={}", reply.ms_since_user_input);
    Ok(Duration::from_millis(u64::from(reply.ms_since_user_input)))
}
