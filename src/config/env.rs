use std::path::Path;

use crate::error::DiscordTokenError;

use super::types::FileConfig;

/// Expand `${VAR}` and `${VAR:-fallback}` references in a config value.
///
/// An unset variable without a fallback is an error. A `$` that does not
/// start a reference is kept as-is.
pub fn expand_env_vars(input: &str) -> Result<String, String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("Unclosed variable reference: ${{{after}"))?;
        let expr = &after[..end];

        match expr.split_once(":-") {
            Some((name, fallback)) => match std::env::var(name) {
                Ok(val) if !val.is_empty() => result.push_str(&val),
                _ => result.push_str(fallback),
            },
            None => {
                let val = std::env::var(expr)
                    .map_err(|_| format!("Environment variable '{expr}' is not set"))?;
                result.push_str(&val);
            }
        }
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

/// Expand variable references in every string field of a file config.
pub fn expand_file_config(config: &mut FileConfig, path: &Path) -> Result<(), DiscordTokenError> {
    let expand = |value: &mut Option<String>| -> Result<(), DiscordTokenError> {
        if let Some(v) = value {
            *v = expand_env_vars(v).map_err(|detail| DiscordTokenError::ConfigError {
                path: path.to_path_buf(),
                detail,
            })?;
        }
        Ok(())
    };
    expand(&mut config.client_id)?;
    expand(&mut config.client_secret)?;
    expand(&mut config.redirect_uri)?;
    expand(&mut config.scope)?;
    expand(&mut config.provider_url)?;

    if let Some(token_path) = &config.token_path {
        let mut raw = Some(token_path.to_string_lossy().into_owned());
        expand(&mut raw)?;
        config.token_path = raw.map(Into::into);
    }
    Ok(())
}
