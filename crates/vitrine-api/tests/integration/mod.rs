mod gatekeeper_edge;
mod recovery_flow;
mod session_flow;
