//! `rulecheck pack`: YAML module description to module image.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rulecheck_core::{write_image, Config, ModuleImage};
use tracing::info;

/// `<name>.<extension>` in the manifest's directory.
pub fn default_output(manifest: &Path, image: &ModuleImage, config: &Config) -> PathBuf {
    manifest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}.{}", image.name, config.binary_extension))
}

pub fn run(manifest: &Path, out: Option<&Path>, config: &Config) -> Result<PathBuf> {
    let content = fs::read_to_string(manifest)
        .with_context(|| format!("failed to read manifest: {}", manifest.display()))?;
    let image = ModuleImage::from_manifest(&content)
        .with_context(|| format!("failed to parse manifest: {}", manifest.display()))?;

    let out = match out {
        Some(path) => path.to_path_buf(),
        None => default_output(manifest, &image, config),
    };
    write_image(&out, &image)
        .with_context(|| format!("failed to write module image: {}", out.display()))?;

    info!(
        module = %image.name,
        types = image.types.len(),
        path = %out.display(),
        "packed module image"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rulecheck_core::decode;
    use tempfile::TempDir;

    use super::*;

    const MANIFEST: &str = r#"
name: Sample
references:
  - name: Expressive
types:
  - name: Model
    fields:
      - name: Level
        ty: Score
        annotations:
          - name: AssertThat
            base: ExpressiveAttribute
            args: ["Level == Score.High"]
  - name: Score
    kind: enum
    variants: [Low, High]
"#;

    #[test]
    fn packs_next_to_manifest_by_default() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("sample.yaml");
        fs::write(&manifest, MANIFEST).unwrap();

        let out = run(&manifest, None, &Config::default()).unwrap();

        assert_eq!(out, dir.path().join("Sample.rmod"));
        let image = decode(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(image.name, "Sample");
        assert!(image.find_type("Score").unwrap().is_enum());
    }

    #[test]
    fn explicit_output_path_wins() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("sample.yaml");
        fs::write(&manifest, MANIFEST).unwrap();
        let target = dir.path().join("out.bin");

        let out = run(&manifest, Some(&target), &Config::default()).unwrap();

        assert_eq!(out, target);
        assert!(target.exists());
        assert!(!dir.path().join("Sample.rmod").exists());
    }

    #[test]
    fn invalid_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("broken.yaml");
        fs::write(&manifest, "types: 12").unwrap();

        let err = run(&manifest, None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("failed to parse manifest"));
    }
}
