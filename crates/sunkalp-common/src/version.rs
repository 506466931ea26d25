//! ---
//! ems_section: "14-versioning-licensing-system"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Version metadata captured at build time."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---

fn build_var(value: Option<&'static str>) -> &'static str {
    value.unwrap_or("unknown")
}

/// Multi-line text printed by `sunkalp -V`.
///
/// Git and build details come from `vergen`; builds without git metadata
/// report them as `unknown`.
#[must_use]
pub fn version_text() -> String {
    format!(
        "sunkalp {version} (git {sha})\nbuilt {built} for {target} [{profile}]",
        version = env!("CARGO_PKG_VERSION"),
        sha = build_var(option_env!("VERGEN_GIT_SHA")),
        built = build_var(option_env!("VERGEN_BUILD_TIMESTAMP")),
        target = build_var(option_env!("VERGEN_CARGO_TARGET_TRIPLE")),
        profile = build_var(option_env!("VERGEN_CARGO_PROFILE")),
    )
}
