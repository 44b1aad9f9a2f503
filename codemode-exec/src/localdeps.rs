//! Validation of operator-supplied local crate paths.
//!
//! Each path must contain a `Cargo.toml` with a `[package] name`; the
//! declared name is what the sandbox package depends on. Any invalid
//! path is an infrastructure error raised before a subprocess runs.

use std::path::PathBuf;

use codemode_gen::manifest::LocalDep;
use codemode_types::ExecError;

pub(crate) fn validate_local_deps(paths: &[PathBuf]) -> Result<Vec<LocalDep>, ExecError> {
    let mut deps = Vec::with_capacity(paths.len());
    for path in paths {
        let path = std::fs::canonicalize(path).map_err(|e| {
            ExecError::Infrastructure(format!(
                "local dependency path {}: {e}",
                path.display()
            ))
        })?;
        let manifest_path = path.join("Cargo.toml");
        let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| {
            ExecError::Infrastructure(format!(
                "local dependency path {}: no readable Cargo.toml: {e}",
                path.display()
            ))
        })?;
        let parsed: toml::Value = toml::from_str(&manifest).map_err(|e| {
            ExecError::Infrastructure(format!(
                "local dependency path {}: invalid Cargo.toml: {e}",
                path.display()
            ))
        })?;
        let name = parsed
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(toml::Value::as_str)
            .ok_or_else(|| {
                ExecError::Infrastructure(format!(
                    "local dependency path {}: Cargo.toml has no [package] name",
                    path.display()
                ))
            })?;
        deps.push(LocalDep {
            name: name.to_string(),
            path,
        });
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_local_dep_resolves_declared_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"my-helper\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();

        let deps = validate_local_deps(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "my-helper");
        assert_eq!(deps[0].path, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn missing_manifest_is_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_local_deps(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, ExecError::Infrastructure(_)));
        assert!(err.to_string().contains("Cargo.toml"));
    }

    #[test]
    fn missing_package_name_is_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").unwrap();
        let err = validate_local_deps(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(err.to_string().contains("no [package] name"));
    }

    #[test]
    fn nonexistent_path_is_infrastructure_error() {
        let err =
            validate_local_deps(&[PathBuf::from("/definitely/not/a/real/path")]).unwrap_err();
        assert!(matches!(err, ExecError::Infrastructure(_)));
    }
}
