use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use shared_types::protocol::{EventMetaData, UserInfo, UserTime};

/// Current time in microseconds since the Unix epoch.
#[must_use]
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
}

/// Timing and user annotations of an [`Event`](super::Event).
///
/// Timestamps are microseconds since the Unix epoch, `0` when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    create_time: i64,
    send_time: i64,
    receive_time: i64,
    deliver_time: i64,
    user_infos: BTreeMap<String, String>,
    user_times: BTreeMap<String, i64>,
}

impl MetaData {
    /// Meta data created now.
    #[must_use]
    pub fn created_now() -> Self {
        Self {
            create_time: now_micros(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn create_time(&self) -> i64 {
        self.create_time
    }

    #[must_use]
    pub fn send_time(&self) -> i64 {
        self.send_time
    }

    #[must_use]
    pub fn receive_time(&self) -> i64 {
        self.receive_time
    }

    #[must_use]
    pub fn deliver_time(&self) -> i64 {
        self.deliver_time
    }

    pub fn set_create_time(&mut self, micros: i64) {
        self.create_time = micros;
    }

    pub fn set_send_time(&mut self, micros: i64) {
        self.send_time = micros;
    }

    pub fn set_receive_time(&mut self, micros: i64) {
        self.receive_time = micros;
    }

    pub fn set_deliver_time(&mut self, micros: i64) {
        self.deliver_time = micros;
    }

    #[must_use]
    pub fn user_info(&self, key: &str) -> Option<&str> {
        self.user_infos.get(key).map(String::as_str)
    }

    pub fn set_user_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.user_infos.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn user_infos(&self) -> &BTreeMap<String, String> {
        &self.user_infos
    }

    #[must_use]
    pub fn user_time(&self, key: &str) -> Option<i64> {
        self.user_times.get(key).copied()
    }

    pub fn set_user_time(&mut self, key: impl Into<String>, micros: i64) {
        self.user_times.insert(key.into(), micros);
    }

    #[must_use]
    pub fn user_times(&self) -> &BTreeMap<String, i64> {
        &self.user_times
    }

    #[must_use]
    pub fn to_message(&self) -> EventMetaData {
        EventMetaData {
            create_time: self.create_time,
            send_time: self.send_time,
            receive_time: self.receive_time,
            deliver_time: self.deliver_time,
            user_times: self
                .user_times
                .iter()
                .map(|(key, timestamp)| UserTime {
                    key: key.as_bytes().to_vec(),
                    timestamp: *timestamp,
                })
                .collect(),
            user_infos: self
                .user_infos
                .iter()
                .map(|(key, value)| UserInfo {
                    key: key.as_bytes().to_vec(),
                    value: value.as_bytes().to_vec(),
                })
                .collect(),
        }
    }

    /// Keys and values that are not UTF-8 are converted lossily.
    #[must_use]
    pub fn from_message(message: &EventMetaData) -> Self {
        Self {
            create_time: message.create_time,
            send_time: message.send_time,
            receive_time: message.receive_time,
            deliver_time: message.deliver_time,
            user_infos: message
                .user_infos
                .iter()
                .map(|info| {
                    (
                        String::from_utf8_lossy(&info.key).into_owned(),
                        String::from_utf8_lossy(&info.value).into_owned(),
                    )
                })
                .collect(),
            user_times: message
                .user_times
                .iter()
                .map(|time| (String::from_utf8_lossy(&time.key).into_owned(), time.timestamp))
                .collect(),
        }
    }
}
