//! External HTTP-reproduction planner: the nine-operation tool surface
//! that infers a target, resolves a request candidate and its auth, and
//! drives the verifier against the agent's control plane (SPEC_FULL.md
//! §2, §4.5-§4.10, §6.3).

pub mod auth;
pub mod execution_plan;
pub mod http_client;
pub mod openapi;
pub mod request_candidate;
pub mod source_index;
pub mod target_infer;
pub mod tool_surface;
pub mod verifier;
