pub mod failover;
pub mod mutual_exclusion;
pub mod partition;
pub mod step_down;

#[cfg(test)]
mod tests {
    #[test]
    fn test_bootstrap() {
        crate::cases::lease::bootstrap::run()
    }

    #[test]
    fn test_mutual_exclusion() {
        crate::cases::lease::mutual_exclusion::run()
    }

    #[test]
    fn test_failover() {
        crate::cases::lease::failover::run()
    }

    #[test]
    fn test_partition() {
        crate::cases::lease::partition::run()
    }

    #[test]
    fn test_graceful_stop() {
        crate::cases::lease::graceful_stop::run()
    }

    #[test]
    fn test_step_down() {
        crate::cases::lease::step_down::run()
    }

    #[test]
    fn test_leader_record() {
        crate::cases::lease::leader_record::run()
    }
}
