//! Layout resolution and the mount point state machine
//!
//! A mount point is `Empty` until the first layout is mounted. After that it
//! keeps the same layout element across navigations and only the content
//! slot changes, unless a different layout kind is required, in which case
//! the old element is dropped and a new one created.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::component::{Layout, Module, Mountable};
use crate::config::RouterConfig;
use crate::error::{LoadError, MountError};
use crate::loader::ModuleLoader;

/// A resolved layout; `kind` is the logical module path it came from
#[derive(Debug, Clone)]
pub struct LayoutRef {
    pub kind: String,
    pub module: Arc<Module>,
}

/// What currently occupies the mount point
pub enum MountContent {
    Empty,
    Layout { kind: String, element: Box<dyn Layout> },
    /// A diagnostic view replaced whatever was there
    View(String),
}

/// The single container the router owns
pub struct MountPoint {
    selector: String,
    content: MountContent,
    layouts_created: usize,
}

impl MountPoint {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            content: MountContent::Empty,
            layouts_created: 0,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn content(&self) -> &MountContent {
        &self.content
    }

    /// Kind of the mounted layout, if a layout is mounted
    pub fn layout_kind(&self) -> Option<&str> {
        match &self.content {
            MountContent::Layout { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn layout(&self) -> Option<&dyn Layout> {
        match &self.content {
            MountContent::Layout { element, .. } => Some(element.as_ref()),
            _ => None,
        }
    }

    pub fn layout_mut(&mut self) -> Option<&mut dyn Layout> {
        match &mut self.content {
            MountContent::Layout { element, .. } => {
                let layout: &mut dyn Layout = element.as_mut();
                Some(layout)
            }
            _ => None,
        }
    }

    /// Number of layout elements ever created here
    pub fn layouts_created(&self) -> usize {
        self.layouts_created
    }

    /// Replaces everything with a diagnostic view
    pub fn show_view(&mut self, html: String) {
        self.content = MountContent::View(html);
    }

    /// Serialized subtree of the mount point
    pub fn render(&self) -> String {
        match &self.content {
            MountContent::Empty => String::new(),
            MountContent::Layout { element, .. } => element.render(),
            MountContent::View(html) => html.clone(),
        }
    }
}

/// Picks group layouts with a global fallback, and mounts them
pub struct LayoutResolver {
    config: Arc<RouterConfig>,
    loader: Arc<dyn ModuleLoader>,
    default_layout: Option<LayoutRef>,
    // group → resolved group layout, `None` remembers an expected miss
    groups: HashMap<String, Option<LayoutRef>>,
}

impl LayoutResolver {
    pub fn new(config: Arc<RouterConfig>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            config,
            loader,
            default_layout: None,
            groups: HashMap::new(),
        }
    }

    /// Loads the global layout once; later calls return the cached one
    pub async fn preload_default(&mut self) -> Result<LayoutRef, LoadError> {
        if let Some(layout) = &self.default_layout {
            return Ok(layout.clone());
        }

        let path = self.config.default_layout_path();
        let layout = self.load_layout(&path).await?;
        debug!(layout = %path, "Default layout loaded");
        self.default_layout = Some(layout.clone());
        Ok(layout)
    }

    /// Layout for a route group, falling back to the global layout
    ///
    /// Most groups have no layout of their own, so a failed group lookup is
    /// expected and remembered for the session.
    pub async fn resolve_layout_for_group(&mut self, group: Option<&str>) -> Result<LayoutRef, LoadError> {
        if let Some(group) = group {
            let cached = match self.groups.get(group) {
                Some(entry) => entry.clone(),
                None => {
                    let path = self.config.group_layout_path(group);
                    let entry = match self.load_layout(&path).await {
                        Ok(layout) => {
                            debug!(group, layout = %path, "Group layout loaded");
                            Some(layout)
                        }
                        Err(LoadError::NotFound(_)) => None,
                        Err(error) => {
                            warn!(group, error = %error, "Group layout failed, using default");
                            None
                        }
                    };
                    self.groups.insert(group.to_string(), entry.clone());
                    entry
                }
            };

            if let Some(layout) = cached {
                return Ok(layout);
            }
        }

        self.preload_default().await
    }

    /// Ensures a layout of the required kind is mounted
    ///
    /// Returns `true` when the existing element was reused.
    pub fn mount(&self, layout: &LayoutRef, mount: &mut MountPoint) -> Result<bool, MountError> {
        if mount.layout_kind() == Some(layout.kind.as_str()) {
            return Ok(true);
        }

        let element = layout.module.instantiate_layout()?;
        debug!(
            selector = %mount.selector,
            from = ?mount.layout_kind(),
            to = %layout.kind,
            "Mounting layout"
        );
        mount.content = MountContent::Layout {
            kind: layout.kind.clone(),
            element,
        };
        mount.layouts_created += 1;
        Ok(false)
    }

    /// Hands a page to the mounted layout's content slot
    ///
    /// Returns the page back when no layout is mounted.
    pub fn set_content(
        mount: &mut MountPoint,
        page: Box<dyn Mountable>,
    ) -> Result<(), Box<dyn Mountable>> {
        match mount.layout_mut() {
            Some(layout) => {
                layout.set_content(page);
                Ok(())
            }
            None => Err(page),
        }
    }

    async fn load_layout(&self, path: &str) -> Result<LayoutRef, LoadError> {
        let module = self.loader.load(path).await?;
        if !module.is_layout() {
            return Err(LoadError::WrongExport {
                path: path.to_string(),
                expected: "layout",
            });
        }
        Ok(LayoutRef {
            kind: path.to_string(),
            module,
        })
    }
}
