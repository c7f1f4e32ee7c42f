//! Cache key conventions.
//!
//! Owner-scoped keys look like `owner:{owner}:{name}` so everything belonging to one
//! caller identity can be dropped with a single prefix invalidation. The `owner:`
//! namespace keeps unscoped keys (`rpc:...`) out of reach of any owner name.

/// Prefix shared by every key scoped to `owner`.
pub fn owner_prefix(owner: &str) -> String {
    format!("owner:{owner}:")
}

/// Key for `name` scoped to `owner`.
pub fn owner_key(owner: &str, name: &str) -> String {
    format!("{}{name}", owner_prefix(owner))
}

/// Key for an RPC call: method plus its serialized params.
pub fn rpc_key(method: &str, params: &serde_json::Value) -> String {
    format!("rpc:{method}:{params}")
}
