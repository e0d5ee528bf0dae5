use std::any::Any;

use sb_01_converters::AnnotatedData;
use shared_types::{EventId, Scope};

use super::MetaData;

/// An application value published on a scope.
#[derive(Debug)]
pub struct Event {
    scope: Scope,
    data: AnnotatedData,
    event_id: Option<EventId>,
    method: Option<String>,
    meta_data: MetaData,
    causes: Vec<EventId>,
}

impl Event {
    /// New event on `scope`, created now. The id is assigned when it is
    /// pushed.
    #[must_use]
    pub fn new(scope: Scope, data: AnnotatedData) -> Self {
        Self {
            scope,
            data,
            event_id: None,
            method: None,
            meta_data: MetaData::created_now(),
            causes: Vec::new(),
        }
    }

    /// Shorthand for an event carrying `value` under its own data type.
    pub fn with_value<T: Any + Send + Sync>(scope: Scope, value: T) -> Self {
        Self::new(scope, AnnotatedData::new(value))
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: EventId) -> Self {
        self.causes.push(cause);
        self
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn data(&self) -> &AnnotatedData {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> AnnotatedData {
        self.data
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    #[must_use]
    pub fn event_id(&self) -> Option<EventId> {
        self.event_id
    }

    pub fn set_event_id(&mut self, event_id: EventId) {
        self.event_id = Some(event_id);
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    #[must_use]
    pub fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    pub fn meta_data_mut(&mut self) -> &mut MetaData {
        &mut self.meta_data
    }

    #[must_use]
    pub fn causes(&self) -> &[EventId] {
        &self.causes
    }

    pub(crate) fn from_parts(
        scope: Scope,
        data: AnnotatedData,
        event_id: Option<EventId>,
        method: Option<String>,
        meta_data: MetaData,
        causes: Vec<EventId>,
    ) -> Self {
        Self {
            scope,
            data,
            event_id,
            method,
            meta_data,
            causes,
        }
    }
}
