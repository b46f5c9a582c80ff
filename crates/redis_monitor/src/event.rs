use serde::{Deserialize, Serialize};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i64 = 1_000;

/// One command traced by the data store's monitor facility.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    /// Nanoseconds since the epoch; microsecond resolution padded with zeros.
    #[serde(rename = "ts_nano")]
    pub timestamp: i64,
    pub db: u32,
    /// `IP:PORT` of the issuing client, or the token of an internal context
    /// such as `lua`.
    pub source: String,
    #[serde(rename = "cmd")]
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SourceKind {
    /// Issued by a script (`lua`).
    Lua,
    /// Client connected over a unix socket (`unix:/path`).
    Unix,
    /// Client connected over TCP (`host:port` or `[v6]:port`).
    Tcp,
    Other,
}

impl MonitorEvent {
    pub fn source_kind(&self) -> SourceKind {
        let source = self.source.as_str();
        if source == "lua" {
            return SourceKind::Lua;
        }
        if source.starts_with("unix:") {
            return SourceKind::Unix;
        }
        match source.rsplit_once(':') {
            Some((host, port))
                if !host.is_empty()
                    && !port.is_empty()
                    && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                SourceKind::Tcp
            }
            _ => SourceKind::Other,
        }
    }

    /// Whole seconds since the epoch.
    pub fn seconds(&self) -> i64 {
        self.timestamp / NANOS_PER_SECOND
    }

    /// Sub-second part, at the microsecond resolution of the source format.
    pub fn subsec_micros(&self) -> u32 {
        let micros = (self.timestamp % NANOS_PER_SECOND) / NANOS_PER_MICRO;
        u32::try_from(micros).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(source: &str) -> MonitorEvent {
        MonitorEvent {
            timestamp: 1_600_535_204_739_027_000,
            db: 0,
            source: source.to_string(),
            command: "GET".to_string(),
            args: vec!["k".to_string()],
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(event("lua")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "ts_nano": 1_600_535_204_739_027_000_i64,
                "db": 0,
                "source": "lua",
                "cmd": "GET",
                "args": ["k"],
            })
        );
    }

    #[test]
    fn empty_args_serialize_as_empty_array() {
        let mut ev = event("lua");
        ev.args.clear();
        let text = serde_json::to_string(&ev).unwrap();
        assert!(text.ends_with("\"args\":[]}"), "{text}");
    }

    #[test]
    fn classifies_sources_without_rejecting_any() {
        assert_eq!(event("lua").source_kind(), SourceKind::Lua);
        assert_eq!(event("147.75.98.182:55466").source_kind(), SourceKind::Tcp);
        assert_eq!(event("[::1]:6379").source_kind(), SourceKind::Tcp);
        assert_eq!(event("unix:/tmp/redis.sock").source_kind(), SourceKind::Unix);
        assert_eq!(event("").source_kind(), SourceKind::Other);
        assert_eq!(event("host:").source_kind(), SourceKind::Other);
    }

    #[test]
    fn splits_timestamp_into_textual_parts() {
        let ev = event("lua");
        assert_eq!(ev.seconds(), 1_600_535_204);
        assert_eq!(ev.subsec_micros(), 739_027);
    }
}
