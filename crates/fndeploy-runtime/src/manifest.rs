//! `go.mod` manifest parsing.
//!
//! Only the directives the delegate needs are interpreted: `module`, `go`,
//! `require` and `replace`. Everything else (`toolchain`, `exclude`,
//! `retract`, ...) is skipped, including its parenthesized blocks.

use std::path::Path;

use fndeploy_core::{ConfigError, Module, RuntimeError};
use tracing::debug;

/// Manifest file name at the root of a Go source directory.
pub const MANIFEST_FILE: &str = "go.mod";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Require,
    Replace,
    Ignored,
}

/// Parse manifest text into a [`Module`].
pub fn parse_module(text: &str) -> Result<Module, ConfigError> {
    let mut name: Option<String> = None;
    let mut module = Module::new(String::new());
    let mut block: Option<(Block, usize)> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some((kind, _)) = block {
            if line == ")" {
                block = None;
                continue;
            }
            match kind {
                Block::Require => add_require(&mut module, line, line_no)?,
                Block::Replace => add_replace(&mut module, line, line_no)?,
                Block::Ignored => {}
            }
            continue;
        }

        let (directive, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(d, r)| (d, r.trim()));

        if rest == "(" {
            let kind = match directive {
                "require" => Block::Require,
                "replace" => Block::Replace,
                _ => Block::Ignored,
            };
            block = Some((kind, line_no));
            continue;
        }

        match directive {
            "module" => {
                let value = unquote(rest);
                if value.is_empty() {
                    return Err(invalid(line_no, "module directive without a path"));
                }
                name = Some(value.to_string());
            }
            "go" => {
                if rest.is_empty() {
                    return Err(invalid(line_no, "go directive without a version"));
                }
                module.go_version = Some(rest.to_string());
            }
            "require" => add_require(&mut module, rest, line_no)?,
            "replace" => add_replace(&mut module, rest, line_no)?,
            _ => debug!(directive, line = line_no, "Skipping go.mod directive"),
        }
    }

    if let Some((_, opened_at)) = block {
        return Err(invalid(opened_at, "unterminated block"));
    }

    module.name = name.ok_or(ConfigError::MissingModuleName)?;
    Ok(module)
}

/// Read and parse `<dir>/go.mod`.
///
/// A missing manifest is `Ok(None)`: the directory is not a Go module.
pub async fn read_module(dir: &Path) -> Result<Option<Module>, RuntimeError> {
    let path = dir.join(MANIFEST_FILE);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No go.mod found");
            return Ok(None);
        }
        Err(e) => return Err(RuntimeError::io(path, e)),
    };

    Ok(Some(parse_module(&text)?))
}

fn add_require(module: &mut Module, spec: &str, line: usize) -> Result<(), ConfigError> {
    let mut parts = spec.split_whitespace().map(unquote);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(path), Some(version), None) => {
            module
                .requires
                .insert(path.to_string(), version.to_string());
            Ok(())
        }
        _ => Err(invalid(line, "expected `<module path> <version>`")),
    }
}

fn add_replace(module: &mut Module, spec: &str, line: usize) -> Result<(), ConfigError> {
    let Some((from, to)) = spec.split_once("=>") else {
        return Err(invalid(line, "replace without `=>`"));
    };

    // The source may carry a version; only its path is kept.
    let source = from.split_whitespace().next().map(unquote);
    let target: Vec<&str> = to.split_whitespace().map(unquote).collect();

    match source {
        Some(source) if !target.is_empty() && target.len() <= 2 => {
            module
                .replaces
                .insert(source.to_string(), target.join(" "));
            Ok(())
        }
        _ => Err(invalid(line, "expected `<path> [version] => <path> [version]`")),
    }
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |at| &line[..at])
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

fn invalid(line: usize, reason: &str) -> ConfigError {
    ConfigError::InvalidManifest {
        line,
        reason: reason.to_string(),
    }
}
