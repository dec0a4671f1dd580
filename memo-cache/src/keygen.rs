//! Cache key derivation.
//!
//! A call is fingerprinted by rendering `{f: identity, a: arguments}` into a
//! canonical string and hashing it with domain-separated SHAKE256:
//!
//! ```text
//! key = SHAKE256(len(domain) || domain || canonical, 32)
//! ```
//!
//! Rendering stops descending at [`KEY_DEPTH`]: a container reached at that
//! depth is written as a fixed marker, so argument trees that agree down to
//! depth 4 but differ below it share a key. Scalars are always written, and
//! object fields are written in sorted key order.

use serde_json::Value;
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

use memo_core::constants::{CACHE_KEY_SIZE, COLLAPSED_MARKER, DOMAIN_CACHE_KEY, KEY_DEPTH};
use memo_core::types::{CacheKey, FnIdentity};

/// Computes the cache key for a call.
pub fn cache_key(identity: &FnIdentity, args: &[Value]) -> CacheKey {
    let canonical = canonical_form(identity, args);

    let mut hasher = Shake256::default();
    hasher.update(&(DOMAIN_CACHE_KEY.len() as u32).to_le_bytes());
    hasher.update(DOMAIN_CACHE_KEY);
    hasher.update(canonical.as_bytes());

    let mut reader = hasher.finalize_xof();
    let mut output = [0u8; CACHE_KEY_SIZE];
    reader.read(&mut output);

    CacheKey::from_array(output)
}

/// Renders the canonical, depth-bounded form a key is hashed from.
///
/// ```rust
/// use memo_cache::keygen::canonical_form;
/// use memo_core::FnIdentity;
/// use serde_json::json;
///
/// let form = canonical_form(&FnIdentity::named("get"), &[json!(1), json!("a")]);
/// assert_eq!(form, r#"{"f":"get","a":[1,"a"]}"#);
/// ```
pub fn canonical_form(identity: &FnIdentity, args: &[Value]) -> String {
    let mut out = String::with_capacity(64);
    out.push_str("{\"f\":");
    match identity {
        FnIdentity::Named(name) => push_json_string(&mut out, name),
        FnIdentity::Anonymous(id) => out.push_str(&id.to_string()),
    }
    out.push_str(",\"a\":");
    render_array(args, 1, &mut out);
    out.push('}');
    out
}

fn render(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Array(items) => render_array(items, depth, out),
        Value::Object(map) => {
            if depth >= KEY_DEPTH {
                out.push_str(COLLAPSED_MARKER);
                return;
            }
            // serde_json's map order depends on its feature flags; sort explicitly
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_json_string(out, k);
                out.push(':');
                render(v, depth + 1, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn render_array(items: &[Value], depth: usize, out: &mut String) {
    if depth >= KEY_DEPTH {
        out.push_str(COLLAPSED_MARKER);
        return;
    }
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        render(item, depth + 1, out);
    }
    out.push(']');
}

fn push_json_string(out: &mut String, s: &str) {
    out.push_str(&Value::from(s).to_string());
}
