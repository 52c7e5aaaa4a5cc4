//! Environment variables given to the functions on the command line.

use std::path::Path;

use fndeploy_core::EnvironmentVariables;

use crate::commands::EnvArgs;
use crate::error::CliError;

/// Parse a `KEY=VALUE` argument. The value may be empty or contain `=`.
pub fn parse_env_pair(arg: &str) -> Result<(String, String), CliError> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| CliError::Arguments(format!("expected KEY=VALUE, got \"{arg}\"")))?;

    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(CliError::Arguments(format!(
            "invalid environment variable name in \"{arg}\""
        )));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Read a dotenv file without touching the current process environment.
pub fn read_env_file(path: &Path) -> Result<EnvironmentVariables, CliError> {
    let entries = dotenvy::from_path_iter(path).map_err(|e| env_file_error(path, e))?;

    let mut vars = EnvironmentVariables::new();
    for entry in entries {
        let (key, value) = entry.map_err(|e| env_file_error(path, e))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Build the functions' environment: the env file first, then `--env` pairs.
pub fn collect_envs(args: &EnvArgs) -> Result<EnvironmentVariables, CliError> {
    let mut vars = match args.env_file {
        Some(ref path) => read_env_file(path)?,
        None => EnvironmentVariables::new(),
    };

    for pair in &args.vars {
        let (key, value) = parse_env_pair(pair)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn env_file_error(path: &Path, err: dotenvy::Error) -> CliError {
    match err {
        dotenvy::Error::Io(e) => CliError::Io(format!("{}: {e}", path.display())),
        other => CliError::Config(format!("{}: {other}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("URL=https://x?a=b").unwrap(),
            ("URL".to_string(), "https://x?a=b".to_string())
        );
        assert_eq!(
            parse_env_pair("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_env_pair("NOVALUE").is_err());
        assert!(parse_env_pair("=value").is_err());
        assert!(parse_env_pair("BAD KEY=1").is_err());
    }

    #[test]
    fn test_flags_override_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join(".env");
        std::fs::write(&file, "# comment\nGREETING=hello\nTARGET=\"world\"\n").unwrap();

        let args = EnvArgs {
            vars: vec!["GREETING=hi".to_string()],
            env_file: Some(file),
        };
        let vars = collect_envs(&args).unwrap();

        assert_eq!(vars["GREETING"], "hi");
        assert_eq!(vars["TARGET"], "world");
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_missing_env_file_is_io_error() {
        let args = EnvArgs {
            vars: Vec::new(),
            env_file: Some("/definitely/missing/.env".into()),
        };
        let err = collect_envs(&args).unwrap_err();
        assert_eq!(err.exit_code(), 74);
    }
}
