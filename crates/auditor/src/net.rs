// Socket Helpers
//
// Socket setup and error classification shared by the ingestor and the
// snapshot server.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddrV4;
use tokio::net::UdpSocket;

/// ENFILE: system-wide open file table is full
const ENFILE: i32 = 23;
/// EMFILE: this process ran out of file descriptors
const EMFILE: i32 = 24;

/// Errors after which the socket is still worth using
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
    )
}

/// Out of file descriptors or memory; accept may succeed once connections close
pub(crate) fn is_resource_exhausted(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(ENFILE) | Some(EMFILE))
        || err.kind() == io::ErrorKind::OutOfMemory
}

/// Bind a UDP socket with SO_REUSEADDR, so several auditors on one host can
/// join the same group and port.
pub(crate) fn bind_reusable_udp(addr: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}
