//! Typed shapes for the records the host tool exchanges with the store.
//!
//! Captures and findings are flattened into schema-less [`Record`]s on the
//! way in and rebuilt from them on the way back out. The store itself never
//! looks at these field names except `who` and `description`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Record;

pub const CAPTURE_KIND: &str = "repeater-capture";
pub const FINDING_KIND: &str = "scan-finding";
pub const MESSAGE_KIND: &str = "scan-message";

/// Local time format written to the `timestamp` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const WHO_FIELD: &str = "who";
pub const DESCRIPTION_FIELD: &str = "description";
pub const MESSAGES_FIELD: &str = "messages";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Expected a {expected} record, found {found:?}")]
    WrongKind {
        expected: &'static str,
        found: Option<String>,
    },
    #[error("Record has no {0:?} field")]
    MissingField(&'static str),
    #[error("Invalid port {0:?}")]
    InvalidPort(String),
}

/// Who stored a record, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub timestamp: String,
    pub who: String,
}

impl Provenance {
    pub fn now(who: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            who: who.into(),
        }
    }

    fn stamp(&self, record: &mut Record) {
        record.set_scalar("timestamp", self.timestamp.as_str());
        record.set_scalar(WHO_FIELD, self.who.as_str());
        record.set_scalar(DESCRIPTION_FIELD, "");
    }
}

/// Endpoint an HTTP message was exchanged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpService {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl HttpService {
    fn write_to(&self, record: &mut Record) {
        record.set_scalar("host", self.host.as_str());
        record.set_scalar("port", self.port.to_string());
        record.set_scalar("protocol", self.protocol.as_str());
    }

    fn read_from(record: &Record) -> Result<Self, ShapeError> {
        let port = required(record, "port")?;
        Ok(Self {
            host: required(record, "host")?,
            port: port.trim().parse().map_err(|_| ShapeError::InvalidPort(port))?,
            protocol: required(record, "protocol")?,
        })
    }
}

/// A request/response pair sent from the repeater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCapture {
    pub service: HttpService,
    pub url: String,
    pub request: Vec<u8>,
    pub response: Vec<u8>,
}

impl HttpCapture {
    pub fn into_record(self, provenance: &Provenance) -> Record {
        let mut record = Record::with_kind(CAPTURE_KIND);
        self.service.write_to(&mut record);
        record.set_scalar("url", self.url);
        record.set_scalar("request", self.request);
        record.set_scalar("response", self.response);
        provenance.stamp(&mut record);
        record
    }

    pub fn from_record(record: &Record) -> Result<Self, ShapeError> {
        expect_kind(record, CAPTURE_KIND)?;
        Ok(Self {
            service: HttpService::read_from(record)?,
            url: optional(record, "url"),
            request: record
                .scalar("request")
                .ok_or(ShapeError::MissingField("request"))?
                .to_vec(),
            response: record.scalar("response").unwrap_or_default().to_vec(),
        })
    }
}

/// One HTTP message attached to a scanner finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMessage {
    #[serde(flatten)]
    pub service: HttpService,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub highlight: String,
    pub request: String,
    #[serde(default)]
    pub response: String,
}

impl ScanMessage {
    fn into_record(self, timestamp: &str) -> Record {
        let mut record = Record::with_kind(MESSAGE_KIND);
        self.service.write_to(&mut record);
        record.set_scalar("comment", self.comment);
        record.set_scalar("highlight", self.highlight);
        record.set_scalar("request", self.request);
        record.set_scalar("response", self.response);
        record.set_scalar("timestamp", timestamp);
        record
    }

    fn from_record(record: &Record) -> Result<Self, ShapeError> {
        expect_kind(record, MESSAGE_KIND)?;
        Ok(Self {
            service: HttpService::read_from(record)?,
            comment: optional(record, "comment"),
            highlight: optional(record, "highlight"),
            request: required(record, "request")?,
            response: optional(record, "response"),
        })
    }
}

/// A scanner issue with its supporting messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFinding {
    #[serde(flatten)]
    pub service: HttpService,
    pub url: String,
    pub issue_name: String,
    #[serde(default)]
    pub issue_type: String,
    pub severity: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub issue_background: String,
    #[serde(default)]
    pub issue_detail: String,
    #[serde(default)]
    pub remediation_background: String,
    #[serde(default)]
    pub remediation_detail: String,
    #[serde(default)]
    pub messages: Vec<ScanMessage>,
}

impl ScanFinding {
    pub fn into_record(self, provenance: &Provenance) -> Record {
        let mut record = Record::with_kind(FINDING_KIND);
        self.service.write_to(&mut record);
        record.set_scalar("url", self.url);
        record.set_scalar("issue_name", self.issue_name);
        record.set_scalar("issue_type", self.issue_type);
        record.set_scalar("severity", self.severity);
        record.set_scalar("confidence", self.confidence);
        record.set_scalar("issue_background", self.issue_background);
        record.set_scalar("issue_detail", self.issue_detail);
        record.set_scalar("remediation_background", self.remediation_background);
        record.set_scalar("remediation_detail", self.remediation_detail);
        record.set_list(
            MESSAGES_FIELD,
            self.messages
                .into_iter()
                .map(|m| m.into_record(&provenance.timestamp))
                .collect(),
        );
        provenance.stamp(&mut record);
        record
    }

    pub fn from_record(record: &Record) -> Result<Self, ShapeError> {
        expect_kind(record, FINDING_KIND)?;
        let messages = record
            .list(MESSAGES_FIELD)
            .unwrap_or_default()
            .iter()
            .map(ScanMessage::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            service: HttpService::read_from(record)?,
            url: optional(record, "url"),
            issue_name: required(record, "issue_name")?,
            issue_type: optional(record, "issue_type"),
            severity: optional(record, "severity"),
            confidence: optional(record, "confidence"),
            issue_background: optional(record, "issue_background"),
            issue_detail: optional(record, "issue_detail"),
            remediation_background: optional(record, "remediation_background"),
            remediation_detail: optional(record, "remediation_detail"),
            messages,
        })
    }
}

fn expect_kind(record: &Record, expected: &'static str) -> Result<(), ShapeError> {
    match record.kind() {
        Some(kind) if kind == expected => Ok(()),
        other => Err(ShapeError::WrongKind {
            expected,
            found: other.map(|k| k.into_owned()),
        }),
    }
}

fn required(record: &Record, name: &'static str) -> Result<String, ShapeError> {
    record
        .text(name)
        .map(|v| v.into_owned())
        .ok_or(ShapeError::MissingField(name))
}

fn optional(record: &Record, name: &str) -> String {
    record
        .text(name)
        .map(|v| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            timestamp: "2024-05-01 10:00:00".to_string(),
            who: "alice".to_string(),
        }
    }

    fn service() -> HttpService {
        HttpService {
            host: "example.com".to_string(),
            port: 443,
            protocol: "https".to_string(),
        }
    }

    #[test]
    fn test_capture_record_fields() {
        let capture = HttpCapture {
            service: service(),
            url: "https://example.com/".to_string(),
            request: b"GET / HTTP/1.1\r\n\r\n".to_vec(),
            response: Vec::new(),
        };

        let record = capture.clone().into_record(&provenance());

        assert_eq!(record.kind().as_deref(), Some(CAPTURE_KIND));
        assert_eq!(record.scalar("port"), Some(&b"443"[..]));
        assert_eq!(record.scalar(WHO_FIELD), Some(&b"alice"[..]));
        assert_eq!(record.scalar(DESCRIPTION_FIELD), Some(&b""[..]));
        assert_eq!(HttpCapture::from_record(&record).unwrap(), capture);
    }

    #[test]
    fn test_finding_from_json_and_back() {
        let json = r#"{
            "host": "example.com", "port": 443, "protocol": "https",
            "url": "https://example.com/search",
            "issue_name": "Cross-site scripting (reflected)",
            "severity": "High",
            "confidence": "Certain",
            "messages": [
                {"host": "example.com", "port": 443, "protocol": "https",
                 "request": "GET /search?q=<script> HTTP/1.1\r\n\r\n"}
            ]
        }"#;
        let finding: ScanFinding = serde_json::from_str(json).unwrap();
        assert_eq!(finding.service, service());

        let record = finding.clone().into_record(&provenance());
        let messages = record.list(MESSAGES_FIELD).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind().as_deref(), Some(MESSAGE_KIND));
        assert_eq!(
            messages[0].text("timestamp").as_deref(),
            Some("2024-05-01 10:00:00")
        );

        assert_eq!(ScanFinding::from_record(&record).unwrap(), finding);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let record = Record::with_kind("something-else");
        assert_eq!(
            HttpCapture::from_record(&record).unwrap_err(),
            ShapeError::WrongKind {
                expected: CAPTURE_KIND,
                found: Some("something-else".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut record = Record::with_kind(CAPTURE_KIND);
        record.set_scalar("host", "example.com");
        record.set_scalar("port", "https");
        record.set_scalar("protocol", "https");
        record.set_scalar("request", "GET /");
        assert_eq!(
            HttpCapture::from_record(&record).unwrap_err(),
            ShapeError::InvalidPort("https".to_string())
        );
    }

    #[test]
    fn test_provenance_timestamp_format() {
        let provenance = Provenance::now("bob");
        assert!(chrono::NaiveDateTime::parse_from_str(&provenance.timestamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(provenance.who, "bob");
    }
}
