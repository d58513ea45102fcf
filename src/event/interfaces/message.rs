use std::any::Any;

use super::EventInterface;

pub const MESSAGE_INTERFACE: &str = "sentry.interfaces.Message";

/// A log message template together with its parameters.
///
/// Parameters keep their position; an absent parameter stays `None` and is
/// written as `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageInterface {
    message: String,
    params: Vec<Option<String>>,
}

impl MessageInterface {
    pub fn new(message: impl Into<String>, params: Vec<Option<String>>) -> Self {
        Self {
            message: message.into(),
            params,
        }
    }

    /// Build the payload only if formatting changed the template.
    ///
    /// A message rendered without substitutions carries no extra
    /// information, so adapters skip it.
    ///
    /// ```rust
    /// use raven_rs::event::interfaces::MessageInterface;
    ///
    /// let params = vec![Some("42".to_owned())];
    /// assert!(MessageInterface::from_formatted("id {}", "id 42", params.clone()).is_some());
    /// assert!(MessageInterface::from_formatted("plain", "plain", params).is_none());
    /// ```
    pub fn from_formatted(
        template: &str,
        formatted: &str,
        params: Vec<Option<String>>,
    ) -> Option<Self> {
        (template != formatted).then(|| Self::new(template, params))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn params(&self) -> &[Option<String>] {
        &self.params
    }
}

impl EventInterface for MessageInterface {
    fn interface_name(&self) -> &'static str {
        MESSAGE_INTERFACE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
