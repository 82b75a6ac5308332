//! Where an edit came from: the client address and the change metadata
//! assembled for every write.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, request::Parts},
};
use chrono::Utc;
use hustings_core::version::{ChangeMetadata, VersionId};
use rand_core::OsRng;

use crate::auth::Authenticated;

/// The client's address, if it could be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

/// The last hop of `X-Forwarded-For` (the address our own proxy saw), else
/// the peer address of the connection.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
  headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.rsplit(',').next())
    .map(str::trim)
    .filter(|ip| !ip.is_empty())
    .map(str::to_owned)
    .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let peer = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|info| info.0);
    Ok(ClientIp(client_ip(&parts.headers, peer)))
  }
}

/// Fresh metadata for an edit made now by `user`.
pub fn change_metadata(
  user: &Authenticated,
  ip: ClientIp,
  source: impl Into<String>,
) -> ChangeMetadata {
  let mut metadata = ChangeMetadata::new(VersionId::random(&mut OsRng), Utc::now(), source)
    .by_user(user.username.as_str());
  metadata.ip = ip.0;
  metadata
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn last_forwarded_hop_wins() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.2".parse().unwrap());
    let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
    assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.0.0.2"));
  }

  #[test]
  fn falls_back_to_peer_address() {
    let peer: SocketAddr = "192.0.2.7:51234".parse().unwrap();
    assert_eq!(
      client_ip(&HeaderMap::new(), Some(peer)).as_deref(),
      Some("192.0.2.7")
    );
    assert_eq!(client_ip(&HeaderMap::new(), None), None);
  }

  #[test]
  fn metadata_records_user_and_address() {
    let user = Authenticated {
      username:         "mark".into(),
      trusted_to_merge: false,
    };
    let metadata = change_metadata(&user, ClientIp(Some("10.0.0.2".into())), "Wikipedia");
    assert_eq!(metadata.username.as_deref(), Some("mark"));
    assert_eq!(metadata.ip.as_deref(), Some("10.0.0.2"));
    assert_eq!(metadata.information_source, "Wikipedia");
    assert_eq!(metadata.version_id.to_string().len(), 16);
  }
}
