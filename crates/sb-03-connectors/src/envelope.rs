//! Conversion between [`Event`]s and wire [`Notification`]s.
//!
//! ```text
//! Event ── data type name ─→ serialization strategy ─→ converter ─→ Notification
//! Notification ── wire schema ─→ deserialization strategy ─→ converter ─→ Event
//! ```

use sb_01_converters::ConverterSelectionStrategy;
use shared_types::{EventId, Notification, Scope};

use crate::domain::{Event, MetaData};
use crate::error::ConnectorError;

/// Serialize `event` into the envelope written to the bus.
///
/// # Errors
///
/// [`ConnectorError::Selection`] if no converter handles the event's data
/// type, [`ConnectorError::Conversion`] if the converter rejects the value.
pub fn to_notification(
    event: &Event,
    converters: &dyn ConverterSelectionStrategy,
) -> Result<Notification, ConnectorError> {
    let data_type = event.data().data_type();
    let converter = converters.get_converter(data_type.name())?;
    let wire = converter.serialize(data_type, event.data().value())?;

    Ok(Notification {
        event_id: event.event_id().map(|id| id.to_message()),
        scope: event.scope().to_string().into_bytes(),
        wire_schema: wire.wire_schema.into_bytes(),
        data: wire.bytes,
        method: event.method().unwrap_or_default().as_bytes().to_vec(),
        meta_data: Some(event.meta_data().to_message()),
        causes: event.causes().iter().map(EventId::to_message).collect(),
    })
}

/// Rebuild the event carried by `notification`.
///
/// # Errors
///
/// Fails on an unparsable scope or event id, a wire schema without
/// converter, or a payload the converter rejects.
pub fn from_notification(
    notification: &Notification,
    converters: &dyn ConverterSelectionStrategy,
) -> Result<Event, ConnectorError> {
    let scope = Scope::parse(&notification.scope_lossy())?;
    let wire_schema = notification.wire_schema_lossy();
    let converter = converters.get_converter(&wire_schema)?;
    let data = converter.deserialize(&wire_schema, &notification.data)?;

    let event_id = notification
        .event_id
        .as_ref()
        .map(EventId::from_message)
        .transpose()?;
    let causes = notification
        .causes
        .iter()
        .map(EventId::from_message)
        .collect::<Result<Vec<_>, _>>()?;
    let method = (!notification.method.is_empty())
        .then(|| String::from_utf8_lossy(&notification.method).into_owned());
    let meta_data = notification
        .meta_data
        .as_ref()
        .map(MetaData::from_message)
        .unwrap_or_default();

    Ok(Event::from_parts(scope, data, event_id, method, meta_data, causes))
}
