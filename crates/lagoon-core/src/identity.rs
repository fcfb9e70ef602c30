//! Opaque session token minting and resolution.

use crate::types::SessionId;
use log::debug;
use uuid::Uuid;

/// Outcome of resolving a presented session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSession {
    /// Session id bound to this request.
    pub session_id: SessionId,
    /// Whether the id was freshly minted for this request.
    pub minted: bool,
}

/// Resolve a client-presented token into a session id.
///
/// An absent or malformed token mints a fresh v4 UUID; `Uuid::new_v4` draws
/// from the OS CSPRNG, so minted ids are not guessable. A well-formed token
/// is accepted without consulting the store: an unknown id lazily creates
/// its session on the first append.
pub fn resolve(presented: Option<&str>) -> ResolvedSession {
    let parsed = presented
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .and_then(|token| Uuid::parse_str(token).ok());

    match parsed {
        Some(session_id) => ResolvedSession {
            session_id,
            minted: false,
        },
        None => {
            let session_id = Uuid::new_v4();
            debug!("minted new session (session_id={session_id})");
            ResolvedSession {
                session_id,
                minted: true,
            }
        }
    }
}

/// Render a session id as the opaque credential echoed to clients.
pub fn token(session_id: SessionId) -> String {
    session_id.to_string()
}
