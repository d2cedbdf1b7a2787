//! Loadable modules and the capabilities of what they create
//!
//! A module explicitly declares its mount tag and exports either a page
//! factory or a layout factory. Nothing is derived from type names.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{panic_message, MountError};

/// Shared lifecycle of every page component
pub trait Mountable: Send {
    /// Called once after the router has attached route state
    fn on_mount(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn get_state(&self, key: &str) -> Option<&Value>;

    fn set_state(&mut self, key: &str, value: Value);

    /// Serialized markup of the component
    fn render(&self) -> String;
}

/// A persistent shell whose content slot is replaced per navigation
pub trait Layout: Send {
    /// Replaces the page in the content slot; chrome stays untouched
    fn set_content(&mut self, page: Box<dyn Mountable>);

    fn content(&self) -> Option<&dyn Mountable>;

    fn render(&self) -> String;
}

pub type PageFactory = Arc<dyn Fn() -> anyhow::Result<Box<dyn Mountable>> + Send + Sync>;
pub type LayoutFactory = Arc<dyn Fn() -> anyhow::Result<Box<dyn Layout>> + Send + Sync>;

/// What a module hands to the router
#[derive(Clone)]
pub enum ModuleExport {
    Page(PageFactory),
    Layout(LayoutFactory),
}

/// A loaded module: explicit mount tag plus its factory
#[derive(Clone)]
pub struct Module {
    mount_tag: String,
    export: ModuleExport,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.export {
            ModuleExport::Page(_) => "page",
            ModuleExport::Layout(_) => "layout",
        };
        f.debug_struct("Module")
            .field("mount_tag", &self.mount_tag)
            .field("export", &kind)
            .finish()
    }
}

impl Module {
    /// Creates a page module
    ///
    /// # Examples
    ///
    /// ```
    /// use classroute_router::{Module, MarkupPage};
    ///
    /// let module = Module::page("contact-page", || {
    ///     Ok(Box::new(MarkupPage::new("contact-page", "<h1>Contact</h1>")))
    /// });
    /// assert_eq!(module.mount_tag(), "contact-page");
    /// assert!(module.is_page());
    /// ```
    pub fn page<F>(mount_tag: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Mountable>> + Send + Sync + 'static,
    {
        Self {
            mount_tag: mount_tag.into(),
            export: ModuleExport::Page(Arc::new(factory)),
        }
    }

    /// Creates a layout module
    pub fn layout<F>(mount_tag: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Layout>> + Send + Sync + 'static,
    {
        Self {
            mount_tag: mount_tag.into(),
            export: ModuleExport::Layout(Arc::new(factory)),
        }
    }

    /// Page module rendering fixed markup
    pub fn markup_page(mount_tag: impl Into<String>, markup: impl Into<String>) -> Self {
        let tag = mount_tag.into();
        let markup = markup.into();
        let page_tag = tag.clone();
        Self::page(tag, move || Ok(Box::new(MarkupPage::new(&page_tag, &markup)) as Box<dyn Mountable>))
    }

    /// Layout module wrapping the page between a header and a footer
    pub fn slot_layout(mount_tag: impl Into<String>, header: impl Into<String>) -> Self {
        let tag = mount_tag.into();
        let header = header.into();
        let layout_tag = tag.clone();
        Self::layout(tag, move || Ok(Box::new(SlotLayout::new(&layout_tag, &header)) as Box<dyn Layout>))
    }

    pub fn mount_tag(&self) -> &str {
        &self.mount_tag
    }

    pub fn export(&self) -> &ModuleExport {
        &self.export
    }

    pub fn is_page(&self) -> bool {
        matches!(self.export, ModuleExport::Page(_))
    }

    pub fn is_layout(&self) -> bool {
        matches!(self.export, ModuleExport::Layout(_))
    }

    /// Runs the page factory; errors and panics become `MountError`
    pub fn instantiate_page(&self) -> Result<Box<dyn Mountable>, MountError> {
        match &self.export {
            ModuleExport::Page(factory) => self.guarded(|| factory()),
            ModuleExport::Layout(_) => Err(MountError::Component {
                tag: self.mount_tag.clone(),
                message: "module exports a layout, not a page".to_string(),
            }),
        }
    }

    /// Runs the layout factory; errors and panics become `MountError`
    pub fn instantiate_layout(&self) -> Result<Box<dyn Layout>, MountError> {
        match &self.export {
            ModuleExport::Layout(factory) => self.guarded(|| factory()),
            ModuleExport::Page(_) => Err(MountError::Component {
                tag: self.mount_tag.clone(),
                message: "module exports a page, not a layout".to_string(),
            }),
        }
    }

    fn guarded<T>(&self, f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, MountError> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(MountError::Component {
                tag: self.mount_tag.clone(),
                message: format!("{:#}", e),
            }),
            Err(payload) => Err(MountError::Panicked {
                tag: self.mount_tag.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Key/value state bag pages can embed to satisfy `get_state`/`set_state`
#[derive(Debug, Clone, Default)]
pub struct PageState {
    values: HashMap<String, Value>,
}

impl PageState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

/// Page with fixed inner markup
#[derive(Debug, Clone)]
pub struct MarkupPage {
    tag: String,
    markup: String,
    state: PageState,
}

impl MarkupPage {
    pub fn new(tag: &str, markup: &str) -> Self {
        Self {
            tag: tag.to_string(),
            markup: markup.to_string(),
            state: PageState::default(),
        }
    }
}

impl Mountable for MarkupPage {
    fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    fn set_state(&mut self, key: &str, value: Value) {
        self.state.set(key, value);
    }

    fn render(&self) -> String {
        format!("<{tag}>{}</{tag}>", self.markup, tag = self.tag)
    }
}

/// Layout with a static header and a single content slot
pub struct SlotLayout {
    tag: String,
    header: String,
    content: Option<Box<dyn Mountable>>,
}

impl SlotLayout {
    pub fn new(tag: &str, header: &str) -> Self {
        Self {
            tag: tag.to_string(),
            header: header.to_string(),
            content: None,
        }
    }
}

impl Layout for SlotLayout {
    fn set_content(&mut self, page: Box<dyn Mountable>) {
        self.content = Some(page);
    }

    fn content(&self) -> Option<&dyn Mountable> {
        self.content.as_deref()
    }

    fn render(&self) -> String {
        let inner = self.content.as_ref().map(|c| c.render()).unwrap_or_default();
        format!(
            "<{tag}><header>{}</header><main data-slot=\"content\">{}</main></{tag}>",
            self.header,
            inner,
            tag = self.tag
        )
    }
}
