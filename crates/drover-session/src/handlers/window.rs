use serde_json::Value;

use drover_protocol::error_codes;
use drover_protocol::{Parameters, Response};

use crate::handlers::CommandHandler;
use crate::registry::SessionRegistry;

/// `close`: close the current browser window. Closing the last open
/// window leaves the session invalid, which the caller observes through
/// the validity flag on the same command cycle.
pub struct CloseWindowHandler;

impl CommandHandler for CloseWindowHandler {
    fn execute(
        &self,
        registry: &mut SessionRegistry,
        _parameters: &Parameters,
        response: &mut Response,
    ) {
        if registry.close_current_browser().is_err() {
            response.set_error_response(error_codes::NO_SUCH_WINDOW, "Unable to get browser");
            return;
        }
        response.set_success_response(Value::Null);
    }
}

/// `quit`: request teardown of every browser in the session. Teardown
/// progress is observed through the quit-status query during shutdown.
pub struct QuitHandler;

impl CommandHandler for QuitHandler {
    fn execute(
        &self,
        registry: &mut SessionRegistry,
        _parameters: &Parameters,
        response: &mut Response,
    ) {
        registry.begin_quit();
        response.set_success_response(Value::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBrowser;

    #[test]
    fn test_close_last_window_succeeds_and_invalidates_session() {
        let mut registry = SessionRegistry::new();
        registry.register_browser(FakeBrowser::open("b1").as_browser());

        let mut response = Response::new();
        CloseWindowHandler.execute(&mut registry, &Parameters::new(), &mut response);

        assert_eq!(response.status, error_codes::SUCCESS);
        assert!(!registry.has_open_browsers());
    }

    #[test]
    fn test_close_without_browser_yields_no_such_window() {
        let mut registry = SessionRegistry::new();

        let mut response = Response::new();
        CloseWindowHandler.execute(&mut registry, &Parameters::new(), &mut response);

        assert_eq!(response.status, error_codes::NO_SUCH_WINDOW);
    }

    #[test]
    fn test_quit_requests_teardown_of_every_browser() {
        let mut registry = SessionRegistry::new();
        let slow = FakeBrowser::open_slow_teardown("b1");
        registry.register_browser(slow.as_browser());
        registry.register_browser(FakeBrowser::open("b2").as_browser());

        let mut response = Response::new();
        QuitHandler.execute(&mut registry, &Parameters::new(), &mut response);

        assert_eq!(response.status, error_codes::SUCCESS);
        assert!(registry.quit_requested());
        assert_eq!(registry.pending_teardown_count(), 1);
    }
}
