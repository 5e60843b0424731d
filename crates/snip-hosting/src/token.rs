use std::fs;
use std::path::Path;

use snip_config::HostingConfig;
use snip_core::Secret;

use crate::HostingError;

/// Reads the API token from the configured file, falling back to the
/// configured environment variable. A missing token is fatal.
pub fn load_token(
    config: &HostingConfig,
    workspace_root: &Path,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<Secret, HostingError> {
    if let Some(file) = config.token_file.as_deref() {
        let path = workspace_root.join(file);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let secret = Secret::new(raw.trim().to_owned());
                if !secret.is_blank() {
                    return Ok(secret);
                }
                tracing::warn!(path = %path.display(), "token file is empty");
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "token file unreadable");
            }
        }
    }

    env_lookup(&config.token_env)
        .map(|value| Secret::new(value.trim().to_owned()))
        .filter(|secret| !secret.is_blank())
        .ok_or_else(|| HostingError::MissingToken {
            env: config.token_env.clone(),
            file: config.token_file.clone(),
        })
}
