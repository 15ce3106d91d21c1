//! Records emitted by a crawl run
//!
//! A run emits one add record per accepted page and one delete record per URL
//! that was visited by the previous run but not by this one.

use crate::url::reference_for;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub const FIELD_REFERENCE: &str = "reference";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_EPOCH: &str = "epochSecond";
pub const FIELD_URL: &str = "url";
pub const FIELD_CONTEXT: &str = "context";
pub const FIELD_UUID: &str = "uuid";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_CHILD: &str = "childPages";
pub const FIELD_EXTERNAL: &str = "externalPages";
pub const FIELD_COMMAND: &str = "command";

/// What the consumer should do with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Delete,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    pub reference: String,
    pub url: String,
    pub root_url: String,
    pub content: Vec<u8>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub epoch_second: i64,
    pub uuid: Uuid,
    pub status: u16,
    /// Same-site links, present only for HTML pages
    pub child_pages: Option<Vec<String>>,
    /// Links to other sites, present only for HTML pages
    pub external_pages: Option<Vec<String>>,
}

/// A page that was visited by the previous run but not by this one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecord {
    pub reference: String,
}

impl DeleteRecord {
    pub fn for_url(url: &str) -> Self {
        Self {
            reference: reference_for(url),
        }
    }
}

/// Any record handed to a sink
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Add(CrawlRecord),
    Delete(DeleteRecord),
}

impl Record {
    pub fn command(&self) -> Command {
        match self {
            Self::Add(_) => Command::Add,
            Self::Delete(_) => Command::Delete,
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Self::Add(record) => &record.reference,
            Self::Delete(record) => &record.reference,
        }
    }

    pub fn as_add(&self) -> Option<&CrawlRecord> {
        match self {
            Self::Add(record) => Some(record),
            Self::Delete(_) => None,
        }
    }

    /// Flattens the record into the field map consumed by downstream sinks
    ///
    /// Response headers are copied under their own names next to the fixed
    /// fields; content is base64 encoded.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        match self {
            Self::Add(record) => {
                for (name, values) in &record.headers {
                    fields.insert(name.clone(), json!(values));
                }

                fields.insert(FIELD_REFERENCE.into(), json!(record.reference));
                fields.insert(FIELD_CONTENT.into(), json!(STANDARD.encode(&record.content)));
                fields.insert(FIELD_EPOCH.into(), json!(record.epoch_second));
                fields.insert(FIELD_URL.into(), json!(record.url));
                fields.insert(FIELD_UUID.into(), json!(record.uuid.to_string()));
                fields.insert(FIELD_STATUS.into(), json!(record.status));
                fields.insert(FIELD_CONTEXT.into(), json!(record.root_url));

                if let Some(children) = &record.child_pages {
                    fields.insert(FIELD_CHILD.into(), json!(children));
                }
                if let Some(external) = &record.external_pages {
                    fields.insert(FIELD_EXTERNAL.into(), json!(external));
                }
            }
            Self::Delete(record) => {
                fields.insert(FIELD_REFERENCE.into(), json!(record.reference));
            }
        }

        fields.insert(FIELD_COMMAND.into(), json!(self.command().to_string()));
        fields
    }
}
