//! Path rendering
//!
//! Every remote path is rooted at `/{environment}`. A prefix without a
//! leading slash is local to the service (`/{env}/{service}/{prefix}`); a
//! prefix with a leading slash is global and elides the service segment
//! (`/{env}/{prefix}`).

/// Render the absolute path prefix for an environment and service
///
/// # Examples
/// - `("", "dev", "svc1")` → `/dev/svc1`
/// - `("simple", "dev", "svc1")` → `/dev/svc1/simple`
/// - `("/global/shared", "dev", "svc1")` → `/dev/global/shared`
#[must_use]
pub fn render_prefix(prefix: &str, environment: &str, service: &str) -> String {
    let env = trim_slashes(environment);
    let svc = trim_slashes(service);
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);

    if prefix.is_empty() {
        return format!("/{env}/{svc}");
    }

    match prefix.strip_prefix('/') {
        Some(global) => format!("/{env}/{global}"),
        None => format!("/{env}/{svc}/{prefix}"),
    }
}

/// Whether a rendered or raw prefix is in global mode
#[inline]
#[must_use]
pub fn is_global(prefix: &str) -> bool {
    prefix.starts_with('/')
}

fn trim_slashes(segment: &str) -> &str {
    let segment = segment.strip_prefix('/').unwrap_or(segment);
    segment.strip_suffix('/').unwrap_or(segment)
}
