/// Local syslog client speaking the BSD (RFC 3164) datagram format
use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tokio::net::UnixDatagram;

pub const SYSLOG_SOCKET: &str = "/dev/log";

const FACILITY_LOCAL5: u8 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Err = 3,
    Info = 6,
}

/// Datagram connection to the system logger, tagged `<ident>[<pid>]`
#[derive(Debug)]
pub struct Syslog {
    socket: UnixDatagram,
    socket_path: PathBuf,
    ident: String,
    pid: u32,
    local_offset: UtcOffset,
}

impl Syslog {
    pub fn connect(ident: &str, local_offset: UtcOffset) -> io::Result<Self> {
        Self::connect_to(SYSLOG_SOCKET, ident, local_offset)
    }

    pub fn connect_to(
        socket_path: impl AsRef<Path>,
        ident: &str,
        local_offset: UtcOffset,
    ) -> io::Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        let socket = UnixDatagram::unbound()?;
        socket.connect(&socket_path)?;
        Ok(Syslog {
            socket,
            socket_path,
            ident: ident.to_string(),
            pid: std::process::id(),
            local_offset,
        })
    }

    /// Send one message, reconnecting once if the logger went away
    ///
    /// A restarted syslog daemon binds a new socket at the same path, which
    /// leaves the old connection refusing every datagram.
    pub async fn send(&self, severity: Severity, message: &str) -> io::Result<()> {
        let now = OffsetDateTime::now_utc().to_offset(self.local_offset);
        let line = format_message(&self.ident, self.pid, severity, &now, message);

        match self.socket.send(line.as_bytes()).await {
            Ok(_) => Ok(()),
            Err(e) if is_disconnect(&e) => {
                debug!("Syslog socket lost ({}), reconnecting", e);
                self.socket.connect(&self.socket_path)?;
                self.socket.send(line.as_bytes()).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
    )
}

/// `<PRI>Mmm dd hh:mm:ss ident[pid]: message`
fn format_message(
    ident: &str,
    pid: u32,
    severity: Severity,
    now: &OffsetDateTime,
    message: &str,
) -> String {
    let priority = FACILITY_LOCAL5 * 8 + severity as u8;
    let format = format_description!("[month repr:short] [day padding:space] [hour]:[minute]:[second]");
    let stamp = now.format(&format).unwrap_or_else(|_| now.to_string());
    format!("<{}>{} {}[{}]: {}", priority, stamp, ident, pid, message)
}
