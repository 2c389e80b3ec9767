//! Rank strategy: the node owning the lowest live ephemeral token leads.

pub mod watch_loop;
