//! Fake automation-layer implementations for tests.
//!
//! The real browser and element objects live behind the `Browser` /
//! `Element` seams and are confined to the worker thread. The fakes keep
//! their state in `Arc<Mutex<_>>` handles so a test on the caller thread
//! can steer objects the worker owns: detach an element mid-session, stall
//! a browser's teardown, and so on.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use drover_common::mutex_lock_or_recover;

use crate::registry::{
    Browser, BrowserFactory, Element, LaunchError, SessionParameters, SessionRegistry,
};

#[derive(Default)]
struct BrowserState {
    open: bool,
    slow_teardown: bool,
}

/// Cross-thread handle to a fake browser. Clones share state.
#[derive(Clone)]
pub struct FakeBrowser {
    id: String,
    state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
    pub fn open(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: Arc::new(Mutex::new(BrowserState {
                open: true,
                slow_teardown: false,
            })),
        }
    }

    /// A browser whose `close` only marks intent; it stays open until
    /// `finish_teardown`. Used to exercise the bounded quit-status poll.
    pub fn open_slow_teardown(id: &str) -> Self {
        let browser = Self::open(id);
        mutex_lock_or_recover(&browser.state).slow_teardown = true;
        browser
    }

    pub fn finish_teardown(&self) {
        mutex_lock_or_recover(&self.state).open = false;
    }

    pub fn is_open(&self) -> bool {
        mutex_lock_or_recover(&self.state).open
    }

    /// The worker-side view, installed into a registry.
    pub fn as_browser(&self) -> Rc<dyn Browser> {
        Rc::new(self.clone())
    }
}

impl Browser for FakeBrowser {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        mutex_lock_or_recover(&self.state).open
    }

    fn close(&self) {
        let mut state = mutex_lock_or_recover(&self.state);
        if !state.slow_teardown {
            state.open = false;
        }
    }
}

#[derive(Default)]
struct ElementState {
    attached: bool,
    attributes: HashMap<String, String>,
    fail_status: Option<i32>,
}

/// Cross-thread handle to a fake element. Clones share state.
#[derive(Clone, Default)]
pub struct FakeElement {
    state: Arc<Mutex<ElementState>>,
}

impl FakeElement {
    pub fn attached() -> Self {
        let element = Self::default();
        mutex_lock_or_recover(&element.state).attached = true;
        element
    }

    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        mutex_lock_or_recover(&self.state)
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Make every attribute read fail with the given domain status code.
    pub fn failing_with(self, status: i32) -> Self {
        mutex_lock_or_recover(&self.state).fail_status = Some(status);
        self
    }

    pub fn detach(&self) {
        mutex_lock_or_recover(&self.state).attached = false;
    }

    pub fn as_element(&self) -> Rc<dyn Element> {
        Rc::new(self.clone())
    }
}

impl Element for FakeElement {
    fn is_attached(&self) -> bool {
        mutex_lock_or_recover(&self.state).attached
    }

    fn attribute_value(&self, name: &str) -> Result<Option<String>, i32> {
        let state = mutex_lock_or_recover(&self.state);
        if let Some(status) = state.fail_status {
            return Err(status);
        }
        Ok(state.attributes.get(name).cloned())
    }
}

/// Factory that installs a prepared set of fakes on the worker thread.
#[derive(Clone, Default)]
pub struct FakeFactory {
    browsers: Vec<FakeBrowser>,
    elements: Vec<(String, FakeElement)>,
    fail: bool,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose launch fails; initialization degrades but must not
    /// crash.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_browser(mut self, browser: &FakeBrowser) -> Self {
        self.browsers.push(browser.clone());
        self
    }

    pub fn with_element(mut self, id: &str, element: &FakeElement) -> Self {
        self.elements.push((id.to_string(), element.clone()));
        self
    }
}

impl BrowserFactory for FakeFactory {
    fn launch(
        &self,
        _params: &SessionParameters,
        registry: &mut SessionRegistry,
    ) -> Result<(), LaunchError> {
        if self.fail {
            return Err(LaunchError(String::from("fake launch failure")));
        }
        for browser in &self.browsers {
            registry.register_browser(browser.as_browser());
        }
        for (id, element) in &self.elements {
            registry.register_element(id, element.as_element());
        }
        Ok(())
    }
}
