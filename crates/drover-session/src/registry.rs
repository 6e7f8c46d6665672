//! Worker-owned registry of live automation handles.
//!
//! Browsers and elements are `Rc`-held and deliberately not `Send`: they
//! are created on the worker thread and never leave it. The only thing
//! that crosses the thread boundary is the `BrowserFactory`, which runs
//! once on the worker side to install the initial browser.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

/// Launch parameters supplied by the caller before initialization.
/// Read-only, consumed once by the factory on the worker thread.
#[derive(Debug, Clone, Default)]
pub struct SessionParameters {
    pub port: u16,
    pub launch_api: String,
    pub browser_switches: String,
}

#[derive(Error, Debug)]
#[error("browser launch failed: {0}")]
pub struct LaunchError(pub String);

/// One live browser window. Implemented by the out-of-scope automation
/// layer; this core only needs identity and open/close state.
pub trait Browser {
    fn id(&self) -> &str;
    fn is_open(&self) -> bool;
    fn close(&self);
}

/// One DOM element reference held by the session.
pub trait Element {
    /// Whether the underlying node is still attached to a live document.
    fn is_attached(&self) -> bool;

    /// Tri-state attribute read: present value, explicit absence, or a
    /// domain status code. Absence is not an error.
    fn attribute_value(&self, name: &str) -> Result<Option<String>, i32>;
}

/// Seam to the out-of-scope launch layer. Runs on the worker thread and
/// installs the initial browser (and whatever else the launch produces)
/// into the registry.
pub trait BrowserFactory: Send {
    fn launch(
        &self,
        params: &SessionParameters,
        registry: &mut SessionRegistry,
    ) -> Result<(), LaunchError>;
}

/// The two element-lookup failure modes, kept distinct all the way to the
/// wire: an id nobody registered versus an id whose target went away.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ElementLookupError {
    #[error("element id is not registered")]
    NotFound,
    #[error("element is no longer attached")]
    Stale,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("no current browser")]
pub struct NoCurrentBrowser;

#[derive(Default)]
pub struct SessionRegistry {
    browsers: HashMap<String, Rc<dyn Browser>>,
    elements: HashMap<String, Rc<dyn Element>>,
    current_browser_id: String,
    quit_requested: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a browser. The first registered browser becomes current.
    pub fn register_browser(&mut self, browser: Rc<dyn Browser>) {
        if self.current_browser_id.is_empty() {
            self.current_browser_id = browser.id().to_string();
        }
        self.browsers.insert(browser.id().to_string(), browser);
    }

    pub fn register_element(&mut self, id: &str, element: Rc<dyn Element>) {
        self.elements.insert(id.to_string(), element);
    }

    pub fn current_browser(&self) -> Result<Rc<dyn Browser>, NoCurrentBrowser> {
        self.browsers
            .get(&self.current_browser_id)
            .filter(|b| b.is_open())
            .cloned()
            .ok_or(NoCurrentBrowser)
    }

    /// Resolve an element id, distinguishing "never registered" from
    /// "registered but detached".
    pub fn element(&self, id: &str) -> Result<Rc<dyn Element>, ElementLookupError> {
        let element = self.elements.get(id).ok_or(ElementLookupError::NotFound)?;
        if !element.is_attached() {
            return Err(ElementLookupError::Stale);
        }
        Ok(Rc::clone(element))
    }

    /// Close the current browser window. Closing the last open browser
    /// leaves the session invalid.
    pub fn close_current_browser(&mut self) -> Result<(), NoCurrentBrowser> {
        let browser = self.current_browser()?;
        browser.close();
        self.browsers.remove(browser.id());
        self.current_browser_id = self
            .browsers
            .values()
            .find(|b| b.is_open())
            .map(|b| b.id().to_string())
            .unwrap_or_default();
        Ok(())
    }

    pub fn has_open_browsers(&self) -> bool {
        self.browsers.values().any(|b| b.is_open())
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Ask every browser to tear down. Teardown completion is observed
    /// through `pending_teardown_count`, not assumed.
    pub fn begin_quit(&mut self) {
        self.quit_requested = true;
        for browser in self.browsers.values() {
            browser.close();
        }
    }

    /// Browsers that have not finished tearing down. Zero whenever no quit
    /// is in progress.
    pub fn pending_teardown_count(&self) -> usize {
        if !self.quit_requested {
            return 0;
        }
        self.browsers.values().filter(|b| b.is_open()).count()
    }

    /// Final teardown on worker exit: quit if nobody asked yet, then drop
    /// every handle.
    pub fn tear_down(&mut self) {
        if !self.quit_requested {
            self.begin_quit();
        }
        self.elements.clear();
        self.browsers.clear();
        self.current_browser_id.clear();
    }
}
