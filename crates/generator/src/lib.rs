//! Apigee bundle generation
//!
//! This crate turns the proxy model into an `apiproxy/` directory: the
//! manifest, one file per proxy and target endpoint, and one file per policy.

mod templates;
pub mod xml;

use spec2proxy_common::{ApiProxy, GeneratorError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::{debug, info, warn};

pub use xml::{to_xml, XML_PROLOG};

/// Directory holding the bundle inside the output directory
pub const BUNDLE_ROOT: &str = "apiproxy";

/// Sub-directories created under [`BUNDLE_ROOT`]
pub const BUNDLE_DIRS: &[&str] = &["proxies", "targets", "policies", "resources"];

/// A rendered file, relative to the bundle root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Bundle generator
///
/// Renders every file in memory before anything is written, so template and
/// policy errors never leave a half-written bundle behind.
pub struct BundleGenerator {
    proxy: ApiProxy,
    tera: Tera,
}

impl BundleGenerator {
    /// Create a new bundle generator for a proxy model
    pub fn new(proxy: ApiProxy) -> Result<Self> {
        proxy.validate()?;
        let tera = templates::load_templates()?;
        Ok(Self { proxy, tera })
    }

    pub fn proxy(&self) -> &ApiProxy {
        &self.proxy
    }

    /// Render the manifest, endpoints and policies
    pub fn render(&self) -> Result<Vec<BundleFile>> {
        self.warn_dangling_routes();

        let mut files = vec![self.generate_manifest()?];
        files.extend(self.generate_proxy_endpoints()?);
        files.extend(self.generate_target_endpoints()?);
        files.extend(self.generate_policies()?);
        Ok(files)
    }

    /// Render the bundle and write it under `output_dir/apiproxy`
    ///
    /// Returns the path of the bundle root.
    pub fn generate_to_directory(&self, output_dir: &Path) -> Result<PathBuf> {
        let files = self.render()?;

        if output_dir.exists() && !output_dir.is_dir() {
            return Err(GeneratorError::Generation(format!(
                "{} is not a directory",
                output_dir.display()
            )));
        }

        let bundle_dir = output_dir.join(BUNDLE_ROOT);
        for dir in BUNDLE_DIRS {
            let path = bundle_dir.join(dir);
            fs::create_dir_all(&path).map_err(|e| {
                GeneratorError::Generation(format!(
                    "Failed to create directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        for file in &files {
            let path = bundle_dir.join(&file.path);
            fs::write(&path, &file.contents).map_err(|e| {
                GeneratorError::Generation(format!("Failed to write {}: {}", path.display(), e))
            })?;
            debug!("Wrote {}", path.display());
        }

        info!(
            "Generated {} files for proxy {} in {}",
            files.len(),
            self.proxy.name,
            bundle_dir.display()
        );
        Ok(bundle_dir)
    }

    /// Generate `<ProxyName>.xml`
    fn generate_manifest(&self) -> Result<BundleFile> {
        let mut context = tera::Context::new();
        context.insert("proxy", &self.proxy);
        let policy_names: Vec<&str> = self.proxy.policies.iter().map(|p| p.name()).collect();
        context.insert("policy_names", &policy_names);

        let contents = self.render_template("manifest.xml", &context)?;
        Ok(BundleFile {
            path: PathBuf::from(file_name("proxy", &self.proxy.name)?),
            contents,
        })
    }

    /// Generate `proxies/<EndpointName>.xml`
    fn generate_proxy_endpoints(&self) -> Result<Vec<BundleFile>> {
        let mut files = Vec::new();
        for endpoint in &self.proxy.proxy_endpoints {
            let mut context = tera::Context::new();
            context.insert("endpoint", endpoint);

            files.push(BundleFile {
                path: Path::new("proxies").join(file_name("proxy endpoint", &endpoint.name)?),
                contents: self.render_template("proxy_endpoint.xml", &context)?,
            });
        }
        Ok(files)
    }

    /// Generate `targets/<EndpointName>.xml`
    fn generate_target_endpoints(&self) -> Result<Vec<BundleFile>> {
        let mut files = Vec::new();
        for endpoint in &self.proxy.target_endpoints {
            let mut context = tera::Context::new();
            context.insert("endpoint", endpoint);

            files.push(BundleFile {
                path: Path::new("targets").join(file_name("target endpoint", &endpoint.name)?),
                contents: self.render_template("target_endpoint.xml", &context)?,
            });
        }
        Ok(files)
    }

    /// Generate `policies/<PolicyName>.xml` through the tree codec
    fn generate_policies(&self) -> Result<Vec<BundleFile>> {
        let mut files = Vec::new();
        for policy in &self.proxy.policies {
            let tree = policy.to_tree()?;
            files.push(BundleFile {
                path: Path::new("policies").join(file_name("policy", policy.name())?),
                contents: to_xml(&tree),
            });
        }
        Ok(files)
    }

    fn render_template(&self, name: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|e| GeneratorError::Generation(format!("Template error in {}: {:?}", name, e)))
    }

    fn warn_dangling_routes(&self) {
        for endpoint in &self.proxy.proxy_endpoints {
            for rule in &endpoint.route_rules {
                let known = self
                    .proxy
                    .target_endpoints
                    .iter()
                    .any(|t| t.name == rule.target_endpoint);
                if !known {
                    warn!(
                        "Route rule {} of proxy endpoint {} targets unknown endpoint {}",
                        rule.name, endpoint.name, rule.target_endpoint
                    );
                }
            }
        }
    }
}

/// `<name>.xml`, rejecting names that would escape their directory
fn file_name(kind: &str, name: &str) -> Result<String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(GeneratorError::Generation(format!(
            "{} name '{}' cannot be used as a file name",
            kind, name
        )));
    }
    Ok(format!("{}.xml", name))
}

/// Generate a bundle (convenience function)
pub fn generate_bundle(proxy: ApiProxy, output_dir: &Path) -> Result<PathBuf> {
    let generator = BundleGenerator::new(proxy)?;
    generator.generate_to_directory(output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("policy", "RF-HTTP404").unwrap(), "RF-HTTP404.xml");
        assert!(file_name("policy", "../escape").is_err());
        assert!(file_name("policy", "a\\b").is_err());
        assert!(file_name("policy", "..").is_err());
        assert!(file_name("policy", "").is_err());
    }
}
