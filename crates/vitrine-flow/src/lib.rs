//! Client-resident sign-in flow and session keep-alive.
//!
//! - [`FlowController`]: the username / sign-in / code / password state
//!   machine, calling the [`IdentityGateway`](vitrine_gateway::IdentityGateway)
//!   and handing the principal to a [`SessionEstablisher`] on success
//! - [`SessionContext`]: explicit "is a session expected" value with a
//!   generation counter
//! - [`SessionHeartbeat`]: renews the session on a timer without
//!   resurrecting one that was logged out

#![forbid(unsafe_code)]

pub mod context;
pub mod controller;
pub mod error;
pub mod heartbeat;
pub mod state;

pub use context::{RefreshTicket, SessionContext};
pub use controller::{FlowController, FlowOutcome, SessionEstablisher};
pub use error::FlowError;
pub use heartbeat::{
    Beat, CookieRenewal, DEFAULT_HEARTBEAT_PERIOD, SessionHeartbeat, SessionRenewal,
};
pub use state::{AuthFlowState, FlowEvent, Phase};
