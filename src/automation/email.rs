use crate::error::{CommandResult, FlowCanvasError};
use serde::{Deserialize, Serialize};

/// Configuration of an Email step. Messages are not dispatched from the
/// editor; the step only carries its recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub recipient: String,
}

impl EmailConfig {
    pub fn new(recipient: &str) -> Self {
        Self {
            recipient: recipient.trim().to_string(),
        }
    }

    pub fn validate(&self) -> CommandResult<()> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(FlowCanvasError::Validation(
                "Please enter an email address".to_string(),
            ));
        }

        let valid = recipient
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(FlowCanvasError::Validation(format!(
                "Invalid email address: {}",
                recipient
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_config() {
        assert!(EmailConfig::new(" ops@example.com ").validate().is_ok());
        assert!(EmailConfig::new("").validate().is_err());
        assert!(EmailConfig::new("ops.example.com").validate().is_err());
        assert!(EmailConfig::new("@example.com").validate().is_err());
    }
}
