pub mod commitment;
pub mod funding;
pub mod htlc;

pub use commitment::{create_to_local_script, create_to_remote_script};
pub use funding::create_funding_script;
pub use htlc::{create_offered_htlc_script, create_received_htlc_script};
