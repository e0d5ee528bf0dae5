//! # Wire Protocol Messages
//!
//! Protobuf messages exchanged between participants. Field tags are part of
//! the wire contract and MUST NOT be renumbered.
//!
//! ```text
//! Notification
//! ├── event_id     (EventId)        tag 1
//! ├── scope        (bytes)          tag 6
//! ├── wire_schema  (bytes)          tag 7
//! ├── data         (bytes)          tag 9
//! ├── method       (bytes)          tag 14
//! ├── meta_data    (EventMetaData)  tag 15
//! └── causes       (EventId*)       tag 18
//! ```

/// Protobuf package the messages in this module belong to.
pub const PACKAGE: &str = "scopebus.protocol";

/// Identifies one event: the sending participant plus its sequence number.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EventId {
    /// 16 raw UUID bytes of the sending participant.
    #[prost(bytes = "vec", tag = "1")]
    pub sender_id: Vec<u8>,
    /// Per-sender monotonically increasing sequence number.
    #[prost(uint32, tag = "2")]
    pub sequence_number: u32,
}

/// Free-form string key/value attached to an event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserInfo {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Free-form named timestamp attached to an event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserTime {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    /// Microseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

/// Timing and user meta data of an event.
///
/// All timestamps are microseconds since the Unix epoch; zero means unset.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventMetaData {
    #[prost(int64, tag = "1")]
    pub create_time: i64,
    #[prost(int64, tag = "2")]
    pub send_time: i64,
    #[prost(int64, tag = "3")]
    pub receive_time: i64,
    #[prost(int64, tag = "4")]
    pub deliver_time: i64,
    #[prost(message, repeated, tag = "5")]
    pub user_times: Vec<UserTime>,
    #[prost(message, repeated, tag = "6")]
    pub user_infos: Vec<UserInfo>,
}

/// The envelope written to the wire for every published event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(message, optional, tag = "1")]
    pub event_id: Option<EventId>,
    /// Canonical scope string, e.g. `/sensors/left/`.
    #[prost(bytes = "vec", tag = "6")]
    pub scope: Vec<u8>,
    /// Wire schema of `data`, used to select the deserializing converter.
    #[prost(bytes = "vec", tag = "7")]
    pub wire_schema: Vec<u8>,
    /// Converter output for the event payload.
    #[prost(bytes = "vec", tag = "9")]
    pub data: Vec<u8>,
    #[prost(bytes = "vec", tag = "14")]
    pub method: Vec<u8>,
    #[prost(message, optional, tag = "15")]
    pub meta_data: Option<EventMetaData>,
    #[prost(message, repeated, tag = "18")]
    pub causes: Vec<EventId>,
}

impl Notification {
    /// Scope as a string slice, lossy for non UTF-8 input.
    pub fn scope_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.scope)
    }

    /// Wire schema as a string slice, lossy for non UTF-8 input.
    pub fn wire_schema_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.wire_schema)
    }
}
