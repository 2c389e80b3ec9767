pub mod bootstrap;
pub mod ordering;
pub mod session_expiry;
pub mod step_down;
pub mod suspension;

#[cfg(test)]
mod tests {
    #[test]
    fn test_bootstrap() {
        crate::cases::rank::bootstrap::run()
    }

    #[test]
    fn test_ordering() {
        crate::cases::rank::ordering::run()
    }

    #[test]
    fn test_session_expiry() {
        crate::cases::rank::session_expiry::run()
    }

    #[test]
    fn test_suspension() {
        crate::cases::rank::suspension::run()
    }

    #[test]
    fn test_step_down() {
        crate::cases::rank::step_down::run()
    }

    #[test]
    fn test_withdraw_retry() {
        crate::cases::rank::withdraw_retry::run()
    }
}
