use crate::timestamp::Timestamp;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One request log line as served by `GET /api/logs`.
///
/// Every field is optional, the backend is loose about what it sends.
/// Values of an unexpected JSON type are read as absent instead of failing
/// the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::integer", skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer", skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default, deserialize_with = "lenient::system", skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Process snapshot some servers attach to their log lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Region name to bytes, in the order the server reported them.
    /// Regions without a numeric value read as zero.
    #[serde(default, deserialize_with = "lenient::regions", skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<IndexMap<String, f64>>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer", skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
}

/// Which of the two compared servers produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Server {
    /// Rate-limited baseline. Anything not explicitly server 2 lands here.
    One,
    Two,
}

impl Server {
    pub const ALL: [Server; 2] = [Server::One, Server::Two];

    pub fn of(record: &LogRecord) -> Self {
        match record.server_id {
            Some(2) => Server::Two,
            _ => Server::One,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Server::One => "Server 1",
            Server::Two => "Server 2",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl LogRecord {
    pub fn server(&self) -> Server {
        Server::of(self)
    }

    pub fn memory_usage(&self) -> Option<&IndexMap<String, f64>> {
        self.system.as_ref()?.memory_usage.as_ref()
    }
}

/// Field deserializers that map unexpected JSON types to `None`.
mod lenient {
    use super::*;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
            _ => None,
        })
    }

    pub fn system<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SystemInfo>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            object @ Value::Object(_) => serde_json::from_value(object).ok(),
            _ => None,
        })
    }

    pub fn regions<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<IndexMap<String, f64>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(region, bytes)| (region, bytes.as_f64().unwrap_or(0.0)))
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RecordId>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().map(RecordId::Number).or_else(|| Some(RecordId::Text(n.to_string()))),
            Value::String(s) => Some(RecordId::Text(s)),
            _ => None,
        })
    }
}
