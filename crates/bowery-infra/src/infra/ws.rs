//! Plain `ws://` client sockets shared by the pub/sub and sync stream readers.

use std::io;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use tungstenite::WebSocket;
use tungstenite::client::IntoClientRequest;
use url::Url;

use crate::usecases::ports::ChannelError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

fn connect_error(url: &Url, reason: impl ToString) -> ChannelError {
    ChannelError::Connect {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Connects and completes the handshake. Reads on the returned socket time out
/// after `read_timeout` so reader threads can poll their stop flags.
pub(crate) fn connect_ws(
    url: &Url,
    read_timeout: Duration,
) -> Result<WebSocket<TcpStream>, ChannelError> {
    if url.scheme() != "ws" {
        return Err(connect_error(
            url,
            format!(
                "unsupported websocket scheme '{}'; only ws:// is supported",
                url.scheme()
            ),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| connect_error(url, "websocket URL is missing a host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| connect_error(url, "websocket URL is missing a port"))?;
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|err| connect_error(url, err))?
        .next()
        .ok_or_else(|| connect_error(url, format!("failed to resolve '{host}:{port}'")))?;

    let stream =
        TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(|err| connect_error(url, err))?;
    stream
        .set_nodelay(true)
        .map_err(|err| connect_error(url, err))?;

    let request = url
        .as_str()
        .into_client_request()
        .map_err(|err| connect_error(url, format!("invalid websocket URL: {err}")))?;

    let (mut socket, _response) =
        tungstenite::client::client(request, stream).map_err(|err| match err {
            tungstenite::HandshakeError::Failure(ws_err) => connect_error(url, ws_err),
            tungstenite::HandshakeError::Interrupted(_) => {
                connect_error(url, "websocket handshake interrupted")
            }
        })?;

    let stream = socket.get_mut();
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|err| connect_error(url, err))?;
    stream
        .set_write_timeout(Some(WRITE_TIMEOUT))
        .map_err(|err| connect_error(url, err))?;
    Ok(socket)
}

/// True for the read timeouts `connect_ws` arms.
pub(crate) fn is_timeout(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::Io(io_err)
            if matches!(io_err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    )
}
