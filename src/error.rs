use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Unsafe statement: {0}")]
    UnsafeStatement(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl GatewayError {
    /// Generation and safety failures mean nothing reached the database.
    pub fn is_fail_closed(&self) -> bool {
        matches!(self, GatewayError::Generation(_) | GatewayError::UnsafeStatement(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_generation_and_safety_fail_closed() {
        let all = [
            GatewayError::Generation("empty".to_string()),
            GatewayError::UnsafeStatement("'i'".to_string()),
            GatewayError::Execution("no such table".to_string()),
            GatewayError::Persistence("down".to_string()),
            GatewayError::Config("missing key".to_string()),
            GatewayError::Session("unknown".to_string()),
        ];
        let closed: Vec<bool> = all.iter().map(GatewayError::is_fail_closed).collect();
        assert_eq!(closed, vec![true, true, false, false, false, false]);
    }

    #[test]
    fn test_display_keeps_message() {
        let err = GatewayError::Persistence("Error saving conversation: disk full".to_string());
        assert_eq!(err.to_string(), "Persistence error: Error saving conversation: disk full");
    }
}
