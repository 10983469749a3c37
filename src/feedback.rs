use crate::session::Session;

/// Boolean feedbacks exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    ConnectionStatus,
}

impl Feedback {
    /// Every feedback the module defines
    pub const ALL: [Feedback; 1] = [Feedback::ConnectionStatus];

    /// Identifier the host stores in button configurations
    pub fn id(self) -> &'static str {
        match self {
            Feedback::ConnectionStatus => "ChannelState",
        }
    }

    /// Label shown in the host's feedback picker
    pub fn name(self) -> &'static str {
        match self {
            Feedback::ConnectionStatus => "Connection Status",
        }
    }

    /// Current value of the feedback for a session
    pub fn evaluate(self, session: &Session) -> bool {
        match self {
            Feedback::ConnectionStatus => {
                tracing::debug!("Updating connection status feedback: {}", session.connected);
                session.connected
            }
        }
    }
}

/// Variables published to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Media,
    PlayStartedTrigger,
}

impl Variable {
    /// Every variable the module defines
    pub const ALL: [Variable; 2] = [Variable::Media, Variable::PlayStartedTrigger];

    /// Identifier the host uses in `$(module:id)` references
    pub fn id(self) -> &'static str {
        match self {
            Variable::Media => "media",
            Variable::PlayStartedTrigger => "playStartedTrigger",
        }
    }

    /// Label shown in the host's variable list
    pub fn name(self) -> &'static str {
        match self {
            Variable::Media => "Available media",
            Variable::PlayStartedTrigger => "Play started trigger",
        }
    }
}
