//! Typed-message envelope helpers.
//!
//! Handler mutations carry their operation as a [`TypedMessage`]: the
//! serialized payload bytes paired with the payload's fully-qualified
//! message name. These helpers wrap and unwrap that envelope for the
//! message types the control plane exchanges.

use prost::Message;

use crate::xray::app::proxyman::command::{AddUserOperation, RemoveUserOperation};
use crate::xray::common::protocol::User;
use crate::xray::common::serial::TypedMessage;
use crate::xray::proxy::vmess;

/// Messages that may travel inside a [`TypedMessage`] envelope.
pub trait MessageType: Message + Default {
    /// Fully-qualified protobuf message name, as the server expects it.
    const NAME: &'static str;
}

impl MessageType for AddUserOperation {
    const NAME: &'static str = "xray.app.proxyman.command.AddUserOperation";
}

impl MessageType for RemoveUserOperation {
    const NAME: &'static str = "xray.app.proxyman.command.RemoveUserOperation";
}

impl MessageType for User {
    const NAME: &'static str = "xray.common.protocol.User";
}

impl MessageType for vmess::Account {
    const NAME: &'static str = "xray.proxy.vmess.Account";
}

/// Wrap `message` in a typed envelope.
pub fn to_typed_message<M: MessageType>(message: &M) -> TypedMessage {
    TypedMessage {
        r#type: M::NAME.to_string(),
        value: message.encode_to_vec(),
    }
}

/// Unwrap a typed envelope, checking that it actually carries an `M`.
pub fn from_typed_message<M: MessageType>(message: &TypedMessage) -> Result<M, DecodeError> {
    if message.r#type != M::NAME {
        return Err(DecodeError::TypeMismatch {
            expected: M::NAME,
            found: message.r#type.clone(),
        });
    }
    Ok(M::decode(message.value.as_slice())?)
}

/// Failure to unwrap a [`TypedMessage`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("typed message carries {found}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("malformed typed message payload: {0}")]
    Malformed(#[from] prost::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_remove_user_operation() {
        let op = RemoveUserOperation {
            email: "a@b.com".to_string(),
        };

        let envelope = to_typed_message(&op);
        assert_eq!(
            envelope.r#type,
            "xray.app.proxyman.command.RemoveUserOperation"
        );

        let decoded: RemoveUserOperation = from_typed_message(&envelope).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn rejects_mismatched_type_name() {
        let envelope = to_typed_message(&RemoveUserOperation {
            email: "a@b.com".to_string(),
        });

        let err = from_typed_message::<AddUserOperation>(&envelope).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }
}
