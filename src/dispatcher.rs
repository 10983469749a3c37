use crate::protocol::Inbound;
use crate::session::Session;
use crate::subscription::{Event, ProtocolError, VariableUpdate};

/// Apply an inbound message to the session
///
/// Returns the events to publish, in order.
pub(crate) fn dispatch(session: &mut Session, inbound: Inbound) -> Vec<Event> {
    match inbound {
        Inbound::Ping(ping) if ping.is_from_server() => {
            if session.apply_server_ping(ping) {
                vec![Event::CheckFeedbacks]
            } else {
                Vec::new()
            }
        }
        Inbound::Ping(ping) => {
            tracing::debug!("Ignoring ping from {:?}", ping.sender);
            Vec::new()
        }
        Inbound::MediaUpdate(update) => {
            let labels = session.replace_media(update.media);
            vec![Event::Variable(VariableUpdate::Media(labels))]
        }
        // Reserved: connected headsets and the last command sent to them.
        Inbound::StatusUpdate(_) | Inbound::CommandHistory(_) => Vec::new(),
        Inbound::Error(body) => {
            tracing::debug!("Server error: {}", body);
            vec![Event::ProtocolError(ProtocolError::Server(body))]
        }
        Inbound::NotAuthenticated => {
            tracing::debug!("Server reported legacy authentication error");
            vec![Event::ProtocolError(ProtocolError::NotAuthenticated)]
        }
        Inbound::Unknown(payload) => {
            tracing::trace!("Ignoring unknown message: {}", payload);
            Vec::new()
        }
    }
}
