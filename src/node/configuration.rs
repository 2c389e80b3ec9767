use std::cmp;
use std::time::Duration;

use crate::errors::{new_err, ErrorKind, Result};

/// Retry pacing of the election loops.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ElectionTimings {
    /// Time a granted lease stays valid without renewal.
    pub lease_duration: Duration,
    /// Lower bound of the renewal/acquisition period.
    pub min_renewal_interval: Duration,
    /// Pause after a lost lease or a failed backend call.
    pub failure_backoff: Duration,
    /// How long `stop` waits for the loop to exit.
    pub stop_timeout: Duration,
}

impl Default for ElectionTimings {
    fn default() -> Self {
        ElectionTimings {
            lease_duration: Duration::from_secs(60),
            min_renewal_interval: Duration::from_secs(5),
            failure_backoff: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl ElectionTimings {
    /// Period of the renewal loop: at least three renewal attempts fit into
    /// one lease lifetime, but never more often than `min_renewal_interval`.
    pub fn renewal_period(&self) -> Duration {
        cmp::max(self.min_renewal_interval, self.lease_duration / 3)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElectionConfiguration {
    /// Container (lease strategy) or parent path (rank strategy) of the election.
    pub namespace: String,
    /// Name of the leased resource or prefix of the election path.
    pub resource_name: String,
    pub node_id: String,
    /// Prefix of rank tokens; the backend appends the sequence number.
    pub token_prefix: String,
    pub timings: ElectionTimings,
}

impl Default for ElectionConfiguration {
    fn default() -> Self {
        ElectionConfiguration {
            namespace: "leaderelection".to_string(),
            resource_name: "leader".to_string(),
            node_id: generate_node_id(),
            token_prefix: "node_".to_string(),
            timings: ElectionTimings::default(),
        }
    }
}

impl ElectionConfiguration {
    pub fn with_node_id(node_id: impl Into<String>) -> ElectionConfiguration {
        ElectionConfiguration {
            node_id: node_id.into(),
            ..ElectionConfiguration::default()
        }
    }

    /// Parent path under which rank tokens are registered.
    pub fn election_path(&self) -> String {
        format!(
            "/{}/{}",
            self.namespace.trim_matches('/'),
            self.resource_name.trim_matches('/')
        )
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("namespace", &self.namespace),
            ("resource name", &self.resource_name),
            ("node id", &self.node_id),
            ("token prefix", &self.token_prefix),
        ];
        for (field, value) in names.iter() {
            if value.trim().is_empty() {
                return new_err(
                    ErrorKind::Configuration,
                    format!("Empty {}", field),
                    String::new(),
                );
            }
        }

        let timings = &self.timings;
        if timings.lease_duration == Duration::from_secs(0) {
            return new_err(
                ErrorKind::Configuration,
                "Lease duration must be positive".to_string(),
                String::new(),
            );
        }

        if timings.renewal_period() >= timings.lease_duration {
            return new_err(
                ErrorKind::Configuration,
                "Renewal period does not fit into the lease duration".to_string(),
                format!(
                    "period = {:?}, lease duration = {:?}",
                    timings.renewal_period(),
                    timings.lease_duration
                ),
            );
        }

        if timings.stop_timeout == Duration::from_secs(0) {
            return new_err(
                ErrorKind::Configuration,
                "Stop timeout must be positive".to_string(),
                String::new(),
            );
        }

        Ok(())
    }
}

/// `<hostname>-<uuid>`: unique per process and stable for its lifetime.
pub fn generate_node_id() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{}-{}", host, uuid::Uuid::new_v4())
}
