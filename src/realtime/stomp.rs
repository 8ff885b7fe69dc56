//! Minimal STOMP 1.2 frame codec.
//!
//! Only the client side of the protocol is covered: the frames a
//! subscriber sends and the frames a broker sends back.

use crate::error::{QaHubError, Result};
use std::fmt;
use std::time::Duration;

const NUL: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    fn parse(s: &str) -> Option<Command> {
        Some(match s {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "SEND" => Command::Send,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            "DISCONNECT" => Command::Disconnect,
            _ => return None,
        })
    }

    /// CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First occurrence wins for repeated headers.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn connect(host: &str, heartbeat: Duration) -> Self {
        let ms = heartbeat.as_millis();
        Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", format!("{},{}", ms, ms))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(key));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(QaHubError::Broker(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Decode one frame. `Ok(None)` means the input was only heart-beat EOLs.
pub fn decode(input: &str) -> Result<Option<Frame>> {
    let input = input.trim_start_matches(['\r', '\n']);
    if input.is_empty() || input == "\0" {
        return Ok(None);
    }

    let (head, rest) = split_head(input)
        .ok_or_else(|| QaHubError::Broker("frame has no header terminator".to_string()))?;

    let mut lines = head.lines();
    let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
    let command = Command::parse(command_line)
        .ok_or_else(|| QaHubError::Broker(format!("unknown command '{}'", command_line)))?;

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| QaHubError::Broker(format!("malformed header '{}'", line)))?;
        if command.escapes_headers() {
            headers.push((unescape_header(key)?, unescape_header(value)?));
        } else {
            headers.push((key.to_string(), value.to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let body = match length {
        Some(len) if len <= rest.len() && rest.is_char_boundary(len) => &rest[..len],
        _ => rest.split(NUL).next().unwrap_or_default(),
    };

    Ok(Some(Frame {
        command,
        headers,
        body: body.to_string(),
    }))
}

/// Decode every NUL-terminated frame in one transport message.
pub fn decode_all(input: &str) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for chunk in input.split_inclusive(NUL) {
        if let Some(frame) = decode(chunk)? {
            frames.push(frame);
        }
    }
    Ok(frames)
}

fn split_head(input: &str) -> Option<(&str, &str)> {
    let lf = input.find("\n\n").map(|i| (i, 2));
    let crlf = input.find("\r\n\r\n").map(|i| (i, 4));
    let (idx, sep) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 < b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&input[..idx], &input[idx + sep..]))
}

/// Interval at which the client must send heart-beats, given what it
/// offered and the broker's `heart-beat` header. `None` disables them.
pub fn negotiate_heartbeat(offered: Duration, server_header: Option<&str>) -> Option<Duration> {
    let server_wants = server_header
        .and_then(|h| h.split(',').nth(1))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let offered = offered.as_millis() as u64;
    if offered == 0 || server_wants == 0 {
        return None;
    }
    Some(Duration::from_millis(offered.max(server_wants)))
}

/// The single-EOL keep-alive frame.
pub const HEARTBEAT: &str = "\n";
