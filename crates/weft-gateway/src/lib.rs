//! HTTP gateway for weft: external systems POST events at trigger
//! endpoints, and operators read executions and node logs back out.

mod routes;
mod server;
mod state;

pub use server::EventGateway;
