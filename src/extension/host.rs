//! Host Environment
//! 
//! The capability surface the desktop shell offers to the extension manager,
//! and a file-backed implementation of it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;
use super::error::{ExtensionError, ExtensionResult};

/// Name of the installed-extension list inside the extensions directory
pub const EXTENSIONS_MANIFEST: &str = "extensions.json";

/// Result of a host install request
#[derive(Debug, Clone, PartialEq)]
pub enum InstallResponse {
    /// The user or host cancelled the install
    Cancelled,
    
    /// Records of the installed extensions
    Installed(Vec<Value>),
}

/// Operations the host shell provides. Any of them may fail; callers degrade
/// rather than propagate.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Records of the currently active extensions
    async fn get_active_extensions(&self) -> ExtensionResult<Value>;
    
    /// Install extensions from the given specs
    async fn install_extension(&self, specs: &[String]) -> ExtensionResult<InstallResponse>;
    
    /// Uninstall extensions by name, optionally relaunching afterwards
    async fn uninstall_extension(&self, names: &[String], reload: bool) -> ExtensionResult<bool>;
    
    /// Relaunch the application so every surface reloads its extensions
    async fn relaunch(&self) -> ExtensionResult<()>;
}

/// `package.json` fields read on install
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    name: String,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Host backed by an extensions directory holding `extensions.json`
#[derive(Debug)]
pub struct FileHost {
    extensions_dir: PathBuf,
    relaunch_requested: AtomicBool,
}

impl FileHost {
    pub fn new<P: AsRef<Path>>(extensions_dir: P) -> Self {
        Self {
            extensions_dir: extensions_dir.as_ref().to_path_buf(),
            relaunch_requested: AtomicBool::new(false),
        }
    }
    
    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }
    
    /// Whether a relaunch has been requested since construction
    pub fn relaunch_requested(&self) -> bool {
        self.relaunch_requested.load(Ordering::SeqCst)
    }
    
    fn manifest_path(&self) -> PathBuf {
        self.extensions_dir.join(EXTENSIONS_MANIFEST)
    }
    
    /// Stored records; a missing or unreadable list is empty
    async fn read_records(&self) -> Vec<Value> {
        let path = self.manifest_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No extension list at {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        
        match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unparsable extension list {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }
    
    async fn write_records(&self, records: &[Value]) -> ExtensionResult<()> {
        fs::create_dir_all(&self.extensions_dir).await?;
        let content = serde_json::to_string_pretty(records)
            .map_err(|e| ExtensionError::host_call_failed(format!("Failed to serialise extension list: {}", e)))?;
        fs::write(self.manifest_path(), content).await?;
        Ok(())
    }
    
    /// Record in the shape handed to the extension manager
    fn public_record(record: &Value) -> Value {
        json!({
            "url": record["url"],
            "name": record["name"],
            "productName": record["productName"],
            "active": record["_active"],
            "description": record["description"],
            "version": record["version"],
        })
    }
    
    fn record_name(record: &Value) -> Option<&str> {
        record.get("name").and_then(Value::as_str)
    }
    
    async fn install_one(&self, spec: &str) -> ExtensionResult<Value> {
        let source = PathBuf::from(spec);
        let manifest_content = fs::read_to_string(source.join("package.json")).await
            .map_err(|e| ExtensionError::host_call_failed(format!("No package.json in {}: {}", source.display(), e)))?;
        let manifest: PackageManifest = serde_json::from_str(&manifest_content)
            .map_err(|e| ExtensionError::host_call_failed(format!("Invalid package.json in {}: {}", source.display(), e)))?;
        
        if manifest.name.is_empty() {
            return Err(ExtensionError::host_call_failed(format!("Extension in {} has no name", source.display())));
        }
        
        let target = self.extensions_dir.join(&manifest.name);
        if fs::canonicalize(&source).await.ok() != fs::canonicalize(&target).await.ok() {
            if fs::metadata(&target).await.is_ok() {
                fs::remove_dir_all(&target).await?;
            }
            copy_dir(&source, &target).await?;
        }
        
        let main = manifest.main.as_deref().unwrap_or("index.js");
        info!("Installed extension '{}' to {}", manifest.name, target.display());
        
        Ok(json!({
            "url": target.join(main).to_string_lossy(),
            "name": manifest.name,
            "origin": target.to_string_lossy(),
            "_active": true,
            "productName": manifest.product_name.unwrap_or_default(),
            "description": manifest.description.unwrap_or_default(),
            "version": manifest.version.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl HostEnvironment for FileHost {
    async fn get_active_extensions(&self) -> ExtensionResult<Value> {
        let records = self.read_records().await;
        let active: Vec<Value> = records.iter()
            .filter(|record| record.get("_active").and_then(Value::as_bool) != Some(false))
            .map(Self::public_record)
            .collect();
        Ok(Value::Array(active))
    }
    
    async fn install_extension(&self, specs: &[String]) -> ExtensionResult<InstallResponse> {
        if specs.is_empty() {
            return Ok(InstallResponse::Cancelled);
        }
        
        let mut records = self.read_records().await;
        let mut installed = Vec::with_capacity(specs.len());
        
        for spec in specs {
            let record = match self.install_one(spec).await {
                Ok(record) => record,
                Err(e) => {
                    // Keep the list in step with the directories already copied
                    if !installed.is_empty() {
                        self.write_records(&records).await?;
                    }
                    return Err(e);
                }
            };
            let name = Self::record_name(&record).map(str::to_string);
            records.retain(|existing| Self::record_name(existing) != name.as_deref());
            installed.push(Self::public_record(&record));
            records.push(record);
        }
        
        self.write_records(&records).await?;
        Ok(InstallResponse::Installed(installed))
    }
    
    async fn uninstall_extension(&self, names: &[String], reload: bool) -> ExtensionResult<bool> {
        let mut records = self.read_records().await;
        
        let missing: Vec<&String> = names.iter()
            .filter(|name| !records.iter().any(|r| Self::record_name(r) == Some(name.as_str())))
            .collect();
        if !missing.is_empty() {
            warn!("Cannot uninstall, not installed: {:?}", missing);
            return Ok(false);
        }
        
        let (removed, kept): (Vec<Value>, Vec<Value>) = records.drain(..)
            .partition(|r| Self::record_name(r).map(|n| names.iter().any(|name| name == n)).unwrap_or(false));
        
        for record in &removed {
            let dir = record.get("origin")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .or_else(|| Self::record_name(record).map(|n| self.extensions_dir.join(n)));
            if let Some(dir) = dir {
                if let Err(e) = fs::remove_dir_all(&dir).await {
                    warn!("Failed to remove {}: {}", dir.display(), e);
                }
            }
        }
        
        self.write_records(&kept).await?;
        info!("Uninstalled {} extension(s)", removed.len());
        
        if reload {
            self.relaunch().await?;
        }
        Ok(true)
    }
    
    async fn relaunch(&self) -> ExtensionResult<()> {
        info!("Relaunch requested");
        self.relaunch_requested.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Recursively copy a directory tree
async fn copy_dir(source: &Path, target: &Path) -> ExtensionResult<()> {
    let mut pending = vec![(source.to_path_buf(), target.to_path_buf())];
    
    while let Some((from, to)) = pending.pop() {
        fs::create_dir_all(&to).await?;
        let mut entries = fs::read_dir(&from).await?;
        
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let destination = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((path, destination));
            } else {
                fs::copy(&path, &destination).await?;
            }
        }
    }
    
    Ok(())
}
